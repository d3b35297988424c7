use super::{json_pretty, spin_fail, spin_ok, spinner, Context, TerminalPrompter, EXIT_SUCCESS};
use edgectl_core::{
    push_service, ActivationOutcome, ActivationWorkflow, CoreError, PushOutcome, PushReport,
};
use edgectl_schema::{parse_config_file, ServiceConfig};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PushResult {
    #[serde(flatten)]
    report: PushReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    activation: Option<ActivationOutcome>,
}

pub fn run(ctx: &Context, all: bool, noop: bool, names: &[String]) -> Result<u8, String> {
    if all && !names.is_empty() {
        return Err("usage: pass either --all or service names, not both".to_owned());
    }
    if !all && names.is_empty() {
        return Err("usage: name at least one service, or pass --all".to_owned());
    }

    let config = parse_config_file(&ctx.config_path)
        .map_err(|e| CoreError::from(e).to_string())?;
    let targets: Vec<&ServiceConfig> = if all {
        config.services.iter().collect()
    } else {
        names
            .iter()
            .map(|n| {
                config.service(n).ok_or_else(|| {
                    format!(
                        "usage: service '{n}' is not declared in {}",
                        ctx.config_path.display()
                    )
                })
            })
            .collect::<Result<_, _>>()?
    };

    let gate = ctx.gate(noop);
    gate.require_confirmable().map_err(|e| e.to_string())?;

    let client = ctx.client()?;
    let console_url = client.config().console_url.clone();
    let presenter = ctx.presenter();
    let mut prompter = TerminalPrompter;
    let mut out = ctx.out();
    let mut results = Vec::new();

    for desired in targets {
        let pb = spinner(&format!("comparing {} with its active version…", desired.name));
        let report = push_service(&client, desired).map_err(|e| {
            spin_fail(&pb, &format!("{}: push failed", desired.name));
            e.to_string()
        })?;

        spin_ok(&pb, &format!("compared {}", desired.name));

        let activation = match report.outcome {
            PushOutcome::Unchanged => {
                writeln!(
                    out,
                    "{}: no changes against active version {}",
                    report.service.name, report.active
                )
                .map_err(|e| e.to_string())?;
                None
            }
            PushOutcome::NoEffectiveChange { version } => {
                writeln!(
                    out,
                    "{}: version {version} renders the same as active version {}, not activating",
                    report.service.name, report.active
                )
                .map_err(|e| e.to_string())?;
                None
            }
            PushOutcome::Created { version } => {
                writeln!(
                    out,
                    "{}: created version {version} from version {}",
                    report.service.name, report.active
                )
                .map_err(|e| e.to_string())?;
                for line in report.plan.describe() {
                    writeln!(out, "  {line}").map_err(|e| e.to_string())?;
                }
                let outcome = ActivationWorkflow::new(&client, gate, &mut prompter)
                    .with_presenter(presenter.clone())
                    .with_cancel(ctx.cancel.clone())
                    .with_console_url(&console_url)
                    .activate(&report.service, version, &mut out)
                    .map_err(|e| e.to_string())?;
                Some(outcome)
            }
        };
        results.push(PushResult { report, activation });
    }

    if ctx.json {
        println!("{}", json_pretty(&results)?);
    }
    Ok(EXIT_SUCCESS)
}
