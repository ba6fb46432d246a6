// tests/config_loading.rs

mod common;

use std::time::Duration;

use common::temp_file;

use orgseq::config::model::parse_duration;
use orgseq::config::{load_config, load_config_or_default, load_sequence, validate_sequence};
use orgseq::engine::executor::preflight;
use orgseq::errors::SequenceError;
use orgseq::types::FailurePolicy;

const SEQUENCE_JSON: &str = r#"{
  "name": "demo-build",
  "version": "1.2.0",
  "description": "Builds the demo org",
  "options": { "packageName": "Base" },
  "groups": [
    { "name": "Install packages",
      "steps": [
        { "name": "Install base package",
          "action": "install-package",
          "options": { "packageVersionId": "04tXXX" } }
      ] },
    { "name": "Cleanup",
      "steps": [ { "name": "Delete org", "action": "delete-scratch-org" } ] }
  ]
}"#;

#[test]
fn json_sequence_keeps_document_order() {
    let file = temp_file(".json", SEQUENCE_JSON);
    let sequence = load_sequence(file.path()).expect("valid sequence");

    assert_eq!(sequence.name, "demo-build");
    assert_eq!(sequence.version, "1.2.0");
    let groups: Vec<_> = sequence.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(groups, ["Install packages", "Cleanup"]);
    assert!(sequence.groups[1].steps[0].options.is_empty());
    assert_eq!(sequence.options["packageName"], "Base");

    validate_sequence(&sequence).expect("structurally valid");
    preflight(&sequence).expect("defaults satisfy every step");
}

#[test]
fn toml_sequence_is_parsed_by_extension() {
    let file = temp_file(
        ".toml",
        r#"
name = "toml-build"

[[groups]]
name = "Data"

[[groups.steps]]
name = "Import accounts"
action = "import-data-tree"
options = { plan = "accounts-plan.json" }
"#,
    );

    let sequence = load_sequence(file.path()).expect("valid TOML sequence");
    assert_eq!(sequence.name, "toml-build");
    assert_eq!(sequence.groups[0].steps[0].action, "import-data-tree");
    assert_eq!(sequence.groups[0].steps[0].options["plan"], "accounts-plan.json");
}

#[test]
fn malformed_sequence_is_a_json_error() {
    let file = temp_file(".json", r#"{ "name": "broken", "groups": [ "#);

    match load_sequence(file.path()) {
        Err(SequenceError::JsonError(_)) => {}
        other => panic!("expected JsonError, got {other:?}"),
    }
}

#[test]
fn missing_sequence_file_is_an_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = load_sequence(dir.path().join("absent.json"));
    assert!(matches!(result, Err(SequenceError::IoError(_))));
}

#[test]
fn zero_groups_load_but_fail_validation() {
    let file = temp_file(".json", r#"{ "name": "empty" }"#);
    let sequence = load_sequence(file.path()).expect("shape is valid");

    assert!(matches!(
        validate_sequence(&sequence),
        Err(SequenceError::NoGroups { .. })
    ));
}

#[test]
fn runner_config_overrides_defaults() {
    let file = temp_file(
        ".toml",
        r#"
[runner]
cli_binary = "/opt/sf/bin/sf"
heartbeat_interval = "250ms"
settle_interval = "0s"
command_timeout = "30m"
failure_policy = "exit-code"

[auth]
api_version = "60.0"
auth_dir = "/tmp/auth"
"#,
    );

    let cfg = load_config(file.path()).expect("valid config");
    assert_eq!(cfg.runner.cli_binary, "/opt/sf/bin/sf");
    assert_eq!(cfg.runner.heartbeat_interval, Duration::from_millis(250));
    assert_eq!(cfg.runner.settle_interval, Duration::ZERO);
    assert_eq!(cfg.runner.command_timeout, Some(Duration::from_secs(30 * 60)));
    assert_eq!(cfg.runner.failure_policy, FailurePolicy::ExitCode);
    assert_eq!(cfg.auth.api_version, "60.0");
    assert_eq!(cfg.auth.resolved_auth_dir(), std::path::PathBuf::from("/tmp/auth"));
}

#[test]
fn missing_runner_config_yields_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = load_config_or_default(dir.path().join("Orgseq.toml")).expect("defaults");

    assert_eq!(cfg.runner.cli_binary, "sf");
    assert_eq!(cfg.runner.heartbeat_interval, Duration::from_secs(1));
    assert_eq!(cfg.runner.settle_interval, Duration::from_secs(3));
    assert_eq!(cfg.runner.command_timeout, None);
    assert_eq!(cfg.runner.failure_policy, FailurePolicy::Stderr);
    assert_eq!(cfg.auth.api_version, "59.0");
}

#[test]
fn named_config_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("typo.toml");

    match load_config(&missing) {
        Err(SequenceError::IoError(e)) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected IoError, got {other:?}"),
    }
}

#[test]
fn default_location_is_still_validated_when_present() {
    let file = temp_file(".toml", "[runner]
cli_binary = \"\"\n");
    assert!(matches!(
        load_config_or_default(file.path()),
        Err(SequenceError::ConfigError(_))
    ));
}

#[test]
fn invalid_duration_is_a_toml_error() {
    let file = temp_file(".toml", "[runner]\nheartbeat_interval = \"soon\"\n");
    assert!(matches!(load_config(file.path()), Err(SequenceError::TomlError(_))));
}

#[test]
fn durations_accept_the_usual_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration(" 3s "), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration("2m"), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("5d").is_err());
}

#[test]
fn empty_cli_binary_is_rejected() {
    let file = temp_file(".toml", "[runner]\ncli_binary = \"  \"\n");
    match load_config(file.path()) {
        Err(SequenceError::ConfigError(msg)) => assert!(msg.contains("cli_binary")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_heartbeat_interval_is_rejected() {
    let file = temp_file(".toml", "[runner]\nheartbeat_interval = \"0ms\"\n");
    assert!(matches!(load_config(file.path()), Err(SequenceError::ConfigError(_))));
}
