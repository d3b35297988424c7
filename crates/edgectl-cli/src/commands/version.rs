use super::{
    json_pretty, remote_err, spin_fail, spin_ok, spinner, yes_no, Context, TerminalPrompter,
    EXIT_SUCCESS,
};
use edgectl_core::{lookup_service, ActivationWorkflow, ValidationOutcome, VersionValidator};
use edgectl_remote::EdgeApi;
use std::io::Write;

pub fn list(ctx: &Context, service: &str) -> Result<u8, String> {
    let client = ctx.client()?;
    let svc = lookup_service(&client, service).map_err(|e| e.to_string())?;
    let versions = client.list_versions(&svc.id).map_err(remote_err)?;

    if ctx.json {
        println!("{}", json_pretty(&versions)?);
    } else if versions.is_empty() {
        println!("no versions found for {}", svc.name);
    } else {
        println!(
            "{:<8} {:<8} {:<8} {:<18} COMMENT",
            "VERSION", "ACTIVE", "LOCKED", "UPDATED"
        );
        for v in &versions {
            let updated = v
                .updated_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default();
            println!(
                "{:<8} {:<8} {:<8} {:<18} {}",
                v.number,
                yes_no(v.active),
                yes_no(v.locked),
                updated,
                v.comment.as_deref().unwrap_or("")
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

pub fn validate(ctx: &Context, service: &str, version: u32) -> Result<u8, String> {
    let client = ctx.client()?;
    let svc = lookup_service(&client, service).map_err(|e| e.to_string())?;

    let pb = spinner(&format!("validating version {version} of {}…", svc.name));
    let outcome = VersionValidator::new(&client)
        .validate(&svc.id, version)
        .map_err(|e| {
            spin_fail(&pb, "validation failed");
            e.to_string()
        })?;
    spin_ok(&pb, &format!("version {version} of {} is valid", svc.name));

    if ctx.json {
        let payload = match &outcome {
            ValidationOutcome::Valid => serde_json::json!({
                "service": svc.name,
                "version": version,
                "status": "ok",
                "warnings": [],
            }),
            ValidationOutcome::Warnings { message, warnings } => serde_json::json!({
                "service": svc.name,
                "version": version,
                "status": "warning",
                "message": message,
                "warnings": warnings,
            }),
        };
        println!("{}", json_pretty(&payload)?);
    } else {
        write_warnings(&mut ctx.out(), &svc.name, version, &outcome)
            .map_err(|e| e.to_string())?;
    }
    Ok(EXIT_SUCCESS)
}

pub fn activate(ctx: &Context, service: &str, version: u32, noop: bool) -> Result<u8, String> {
    let gate = ctx.gate(noop);
    gate.require_confirmable().map_err(|e| e.to_string())?;

    let client = ctx.client()?;
    let svc = lookup_service(&client, service).map_err(|e| e.to_string())?;

    let pb = spinner(&format!("validating version {version} of {}…", svc.name));
    let validation = VersionValidator::new(&client)
        .validate(&svc.id, version)
        .map_err(|e| {
            spin_fail(&pb, "validation failed");
            e.to_string()
        })?;
    spin_ok(&pb, &format!("version {version} of {} is valid", svc.name));

    let mut prompter = TerminalPrompter;
    let mut out = ctx.out();
    write_warnings(&mut out, &svc.name, version, &validation).map_err(|e| e.to_string())?;
    let outcome = ActivationWorkflow::new(&client, gate, &mut prompter)
        .with_presenter(ctx.presenter())
        .with_cancel(ctx.cancel.clone())
        .with_console_url(&client.config().console_url)
        .activate(&svc, version, &mut out)
        .map_err(|e| e.to_string())?;

    if ctx.json {
        let payload = serde_json::json!({
            "service": svc.name,
            "service_id": svc.id,
            "version": version,
            "result": outcome,
        });
        println!("{}", json_pretty(&payload)?);
    }
    Ok(EXIT_SUCCESS)
}

/// Print the remote validation message and each warning. A clean
/// validation prints nothing.
fn write_warnings(
    out: &mut dyn Write,
    service: &str,
    version: u32,
    outcome: &ValidationOutcome,
) -> std::io::Result<()> {
    let ValidationOutcome::Warnings { message, warnings } = outcome else {
        return Ok(());
    };
    writeln!(out, "Version {version} on service {service} validated with warnings:")?;
    if let Some(message) = message.as_deref().filter(|m| !m.is_empty()) {
        writeln!(out, "{message}")?;
    }
    for w in warnings {
        writeln!(out, "warning: {w}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_written_once_with_the_message() {
        let outcome = ValidationOutcome::Warnings {
            message: Some("2 warnings".to_owned()),
            warnings: vec!["backend 'spare' is unused".to_owned(), "ttl is 0".to_owned()],
        };
        let mut out = Vec::new();
        write_warnings(&mut out, "edge-1", 7, &outcome).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Version 7 on service edge-1 validated with warnings:\n\
             2 warnings\n\
             warning: backend 'spare' is unused\n\
             warning: ttl is 0\n"
        );
    }

    #[test]
    fn clean_validation_writes_nothing() {
        let mut out = Vec::new();
        write_warnings(&mut out, "edge-1", 7, &ValidationOutcome::Valid).unwrap();
        assert!(out.is_empty());
    }
}
