// tests/executor_fake_adapters.rs

use orgseq_test_utils::builders::{step, test_context, SequenceBuilder, TestRig};
use orgseq_test_utils::{init_tracing, with_timeout};

use serde_json::json;

use orgseq::config::CommandSequence;
use orgseq::engine::{ExecutorState, SequenceExecutor};
use orgseq::errors::SequenceError;
use orgseq::exec::SfCommand;
use orgseq::progress::ProgressSubscriber;

fn install_then_deploy() -> CommandSequence {
    SequenceBuilder::new("demo-build")
        .group(
            "Packages",
            vec![step(
                "Install base package",
                "install-package",
                json!({ "packageName": "Base", "packageVersionId": "04tXXX" }),
            )],
        )
        .group(
            "Metadata",
            vec![step(
                "Deploy demo metadata",
                "deploy-metadata",
                json!({ "mdapiSource": "demo" }),
            )],
        )
        .build()
}

#[tokio::test]
async fn runs_groups_and_steps_in_document_order() {
    init_tracing();

    let rig = TestRig::new().with_mdapi_source("demo");
    let mut executor = SequenceExecutor::new(install_then_deploy(), test_context(), rig.dispatcher());

    let report = with_timeout(executor.execute())
        .await
        .expect("sequence should complete");

    assert_eq!(
        rig.calls.entries(),
        vec![
            "cli:package install".to_string(),
            "cli:project deploy start".to_string(),
        ]
    );
    assert_eq!(executor.state(), ExecutorState::Completed);
    assert!(report.end_time >= report.start_time);
    assert!(report.elapsed_seconds() > 0.0);
    assert_eq!(report.sequence, "demo-build");
    assert_eq!((report.groups, report.steps), (2, 2));
}

#[tokio::test]
async fn failing_step_aborts_the_run_with_step_context() {
    init_tracing();

    let rig = TestRig::new().with_mdapi_source("demo");
    rig.cli
        .fail_on(SfCommand::ProjectDeployStart, "ERROR: component failures");

    let sequence = SequenceBuilder::new("demo-build")
        .group(
            "Packages",
            vec![step(
                "Install base package",
                "install-package",
                json!({ "packageName": "Base", "packageVersionId": "04tXXX" }),
            )],
        )
        .group(
            "Metadata",
            vec![step(
                "Deploy demo metadata",
                "deploy-metadata",
                json!({ "mdapiSource": "demo" }),
            )],
        )
        .group(
            "Cleanup",
            vec![step("Delete org", "delete-scratch-org", json!({}))],
        )
        .build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    let err = with_timeout(executor.execute())
        .await
        .expect_err("deploy failure should abort");

    match &err {
        SequenceError::Command { action, step, message } => {
            assert_eq!(action, "deploy-metadata");
            assert_eq!(step, "Deploy demo metadata");
            assert!(message.contains("component failures"), "message: {message}");
        }
        other => panic!("expected Command error, got {other:?}"),
    }
    assert!(err.to_string().contains("deploy-metadata"));

    // The cleanup group never ran.
    assert_eq!(rig.calls.len(), 2);
    assert_eq!(executor.state(), ExecutorState::Aborted);
    assert!(executor.timer().is_stopped());
    assert_eq!(executor.notifier().live_count(), 0);
}

#[tokio::test]
async fn sequence_without_groups_fails_before_any_adapter_call() {
    let rig = TestRig::new();
    let sequence = SequenceBuilder::new("empty").build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    let err = executor.execute().await.expect_err("no groups");

    assert!(matches!(err, SequenceError::NoGroups { .. }), "got {err:?}");
    assert!(rig.calls.is_empty());
    assert!(executor.timer().is_stopped());
}

#[tokio::test]
async fn empty_group_fails_before_any_adapter_call() {
    let rig = TestRig::new();
    let sequence = SequenceBuilder::new("gap")
        .group(
            "Packages",
            vec![step(
                "Install",
                "install-package",
                json!({ "packageName": "Base", "packageVersionId": "04tXXX" }),
            )],
        )
        .group("Nothing here", vec![])
        .build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    let err = executor.execute().await.expect_err("empty group");

    match err {
        SequenceError::EmptyGroup { group } => assert_eq!(group, "Nothing here"),
        other => panic!("expected EmptyGroup, got {other:?}"),
    }
    assert!(rig.calls.is_empty());
}

#[tokio::test]
async fn configuration_errors_in_later_groups_stop_the_run_up_front() {
    let rig = TestRig::new();
    let sequence = SequenceBuilder::new("typo")
        .group(
            "Packages",
            vec![step(
                "Install",
                "install-package",
                json!({ "packageName": "Base", "packageVersionId": "04tXXX" }),
            )],
        )
        .group(
            "Later",
            vec![step("Mystery", "launch-rockets", json!({}))],
        )
        .build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    let err = executor.execute().await.expect_err("unknown action");

    match err {
        SequenceError::UnknownAction { step, action } => {
            assert_eq!(step, "Mystery");
            assert_eq!(action, "launch-rockets");
        }
        other => panic!("expected UnknownAction, got {other:?}"),
    }
    assert!(rig.calls.is_empty());
    assert_eq!(executor.state(), ExecutorState::Aborted);
}

#[tokio::test]
async fn executor_runs_only_once() {
    let rig = TestRig::new();
    let sequence = SequenceBuilder::new("once")
        .group(
            "Cleanup",
            vec![step("Delete org", "delete-scratch-org", json!({}))],
        )
        .build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    let first = executor.execute().await.expect("first run succeeds");
    let elapsed = first.elapsed;

    let second = executor.execute().await;
    assert!(matches!(second, Err(SequenceError::AlreadyExecuted)));
    assert_eq!(rig.calls.len(), 1);
    assert_eq!(executor.timer().elapsed(), elapsed);
}

#[tokio::test]
async fn sequence_defaults_fill_missing_step_options() {
    let rig = TestRig::new();
    let sequence = SequenceBuilder::new("defaults")
        .default_option("packageName", json!("Base"))
        .group(
            "Packages",
            vec![step(
                "Install",
                "install-package",
                json!({ "packageVersionId": "04tAAA" }),
            )],
        )
        .build();

    let mut executor = SequenceExecutor::new(sequence, test_context(), rig.dispatcher());
    executor.execute().await.expect("defaults satisfy packageName");

    let commands = rig.cli.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].progress_msg.contains("Base"));
}

#[tokio::test]
async fn progress_lines_reach_the_subscriber() {
    let rig = TestRig::new().with_mdapi_source("demo");
    let (subscriber, mut rx) = ProgressSubscriber::channel();

    let mut executor = SequenceExecutor::new(install_then_deploy(), test_context(), rig.dispatcher())
        .with_progress(subscriber);
    executor.execute().await.expect("sequence should complete");
    drop(executor);

    let mut lines = Vec::new();
    while let Some(line) = rx.recv().await {
        lines.push(line);
    }

    assert!(lines.iter().any(|l| l.contains("Installing package Base")));
    assert!(lines.iter().any(|l| l.contains("Deploying metadata from demo")));
}

#[tokio::test]
async fn abort_kills_heartbeats_the_failing_step_left_running() {
    let rig = TestRig::new().with_mdapi_source("demo");
    rig.cli
        .leak_heartbeat_then_fail(SfCommand::PackageInstall, "ERROR: install failed");

    let mut executor = SequenceExecutor::new(install_then_deploy(), test_context(), rig.dispatcher());
    let err = with_timeout(executor.execute())
        .await
        .expect_err("install fails");

    assert!(matches!(err, SequenceError::Command { .. }), "got {err:?}");
    assert_eq!(rig.cli.heartbeats_started(), 1);
    assert_eq!(executor.notifier().live_count(), 0);
    assert!(executor.timer().is_stopped());
    assert_eq!(executor.state(), ExecutorState::Aborted);
}

#[tokio::test]
async fn dropping_a_running_execute_kills_heartbeats_and_stops_the_timer() {
    let rig = TestRig::new().with_mdapi_source("demo");
    rig.cli.leak_heartbeat_then_hang(SfCommand::PackageInstall);

    let mut executor = SequenceExecutor::new(install_then_deploy(), test_context(), rig.dispatcher());
    let outcome =
        tokio::time::timeout(std::time::Duration::from_millis(100), executor.execute()).await;
    assert!(outcome.is_err(), "execute should still be pending");

    assert_eq!(rig.cli.heartbeats_started(), 1);
    assert_eq!(executor.notifier().live_count(), 0);
    assert!(executor.timer().is_stopped());
    assert_eq!(rig.calls.entries(), vec!["cli:package install".to_string()]);

    // The interrupted run never reached a terminal state, so it cannot be retried.
    assert_eq!(executor.state(), ExecutorState::Running);
    assert!(matches!(
        executor.execute().await,
        Err(SequenceError::AlreadyExecuted)
    ));
}
