use edgectl_core::{
    push_service, ActivationOutcome, ActivationWorkflow, CoreError, DiffEngine, InteractionGate,
    PushOutcome, ScriptedPrompter, ValidationOutcome, VersionValidator,
};
use edgectl_remote::mock::{MockApi, VersionResources};
use edgectl_remote::{EdgeApi, ValidationResult};
use edgectl_schema::{parse_config_file, Backend, ServiceId};
use std::fs;
use std::path::Path;

fn write_config(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("config.toml");
    fs::write(&path, content).unwrap();
    path
}

/// Validate, then activate: the composition `version activate` performs.
fn validate_and_activate(
    api: &MockApi,
    gate: InteractionGate,
    prompter: &mut ScriptedPrompter,
    name: &str,
    version: u32,
) -> Result<ActivationOutcome, CoreError> {
    let service = edgectl_core::lookup_service(api, name)?;
    VersionValidator::new(api).validate(&service.id, version)?;
    ActivationWorkflow::new(api, gate, prompter).activate(&service, version, &mut Vec::<u8>::new())
}

// Active 5, candidate 6, and the cross diff equals 5's self diff.
#[test]
fn equal_candidate_is_still_activatable() {
    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 6, Some(5));
    api.set_rendered("SVC1", 5, "backend origin\n");
    api.set_rendered("SVC1", 6, "backend origin\n");
    api.set_diff("SVC1", 5, 6, "backend origin\n");

    let svc = ServiceId::new("SVC1");
    assert!(DiffEngine::new(&api).versions_equal(&svc, 5, 6).unwrap());

    let mut prompter = ScriptedPrompter::new(&[false, true]);
    let outcome = validate_and_activate(
        &api,
        InteractionGate::new(true, false, false),
        &mut prompter,
        "edge-1",
        6,
    )
    .unwrap();
    assert_eq!(
        outcome,
        ActivationOutcome::Activated {
            previous: 5,
            activated: 6
        }
    );
    assert!(api.versions("SVC1")[5].active);
}

#[test]
fn validation_error_blocks_activation() {
    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 7, Some(6));
    api.set_validation("SVC1", 7, ValidationResult::error("syntax error line 12"));

    let mut prompter = ScriptedPrompter::new(&[true, true]);
    let err = validate_and_activate(
        &api,
        InteractionGate::new(true, true, false),
        &mut prompter,
        "edge-1",
        7,
    )
    .unwrap_err();
    assert!(err.to_string().contains("syntax error line 12"));
    assert_eq!(api.call_count("activate_version"), 0);
    assert!(prompter.asked().is_empty());
}

#[test]
fn validation_warnings_allow_activation() {
    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 7, Some(6));
    api.set_validation(
        "SVC1",
        7,
        ValidationResult {
            warnings: vec!["backend 'spare' is unused".to_owned()],
            ..ValidationResult::ok()
        },
    );
    let svc = ServiceId::new("SVC1");
    assert!(matches!(
        VersionValidator::new(&api).validate(&svc, 7).unwrap(),
        ValidationOutcome::Warnings { .. }
    ));
    let mut prompter = ScriptedPrompter::new(&[]);
    let outcome = validate_and_activate(
        &api,
        InteractionGate::new(false, true, false),
        &mut prompter,
        "edge-1",
        7,
    )
    .unwrap();
    assert!(matches!(outcome, ActivationOutcome::Activated { activated: 7, .. }));
}

#[test]
fn push_from_config_file_then_activate() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[service]]
name = "edge-1"

[service.settings]
default_ttl = 300

[[service.domain]]
name = "www.example.com"

[[service.backend]]
name = "origin"
address = "origin.example.com"
port = 443
use_ssl = true
"#,
    );
    let config = parse_config_file(&path).unwrap();

    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 2, Some(2));
    api.set_resources(
        "SVC1",
        2,
        VersionResources {
            backends: vec![Backend {
                name: "origin".to_owned(),
                address: "old-origin.example.com".to_owned(),
                port: 443,
                use_ssl: true,
                ssl_cert_hostname: None,
                connect_timeout: None,
                weight: None,
                shield: None,
            }],
            ..VersionResources::default()
        },
    );

    let report = push_service(&api, &config.services[0]).unwrap();
    let PushOutcome::Created { version } = report.outcome else {
        panic!("expected a new version, got {:?}", report.outcome);
    };
    assert_eq!(version, 3);
    assert_eq!(
        report.plan.describe(),
        vec!["+ domain www.example.com", "~ backend origin", "~ settings"]
    );

    let resources = api.resources("SVC1", 3).unwrap();
    assert_eq!(resources.settings.default_ttl, Some(300));

    let mut prompter = ScriptedPrompter::new(&[]);
    let mut out = Vec::new();
    let gate = InteractionGate::new(false, true, true);
    let outcome = ActivationWorkflow::new(&api, gate, &mut prompter)
        .activate(&report.service, version, &mut out)
        .unwrap();
    assert_eq!(outcome, ActivationOutcome::DryRun);
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("-backend origin { .host = \"old-origin.example.com\""));
    assert!(text.contains("+# domain www.example.com"));
    assert_eq!(api.call_count("activate_version"), 0);
}

#[test]
fn second_push_after_activation_is_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[service]]
name = "edge-1"

[[service.domain]]
name = "www.example.com"
"#,
    );
    let config = parse_config_file(&path).unwrap();
    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 1, Some(1));

    let first = push_service(&api, &config.services[0]).unwrap();
    assert_eq!(first.outcome, PushOutcome::Created { version: 2 });
    api.activate_version(&ServiceId::new("SVC1"), 2).unwrap();

    let second = push_service(&api, &config.services[0]).unwrap();
    assert_eq!(second.outcome, PushOutcome::Unchanged);
    assert_eq!(second.active, 2);
    assert_eq!(api.call_count("clone_version"), 1);
}

#[test]
fn remote_failure_during_push_surfaces() {
    let api = MockApi::new();
    api.add_service("SVC1", "edge-1", 1, Some(1));
    api.fail_on("clone_version");
    let config = edgectl_schema::parse_config_str(
        "[[service]]\nname = \"edge-1\"\n[[service.domain]]\nname = \"a.example.com\"\n",
    )
    .unwrap();
    let err = push_service(&api, &config.services[0]).unwrap_err();
    assert!(err.to_string().starts_with("remote error:"));
}
