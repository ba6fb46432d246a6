// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod progress;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::cli::CliArgs;
use crate::config::loader::default_config_path;
use crate::config::{
    load_config, load_config_or_default, load_sequence, CommandSequence, ConfigFile,
};
use crate::engine::{ExecutionContext, SequenceExecutor, StepAction, StepDispatcher};
use crate::exec::{CredentialStore, SalesforceRestAdapter, SfCliAdapter};
use crate::fs::{FileSystem, RealFileSystem};
use crate::progress::ProgressSubscriber;
use crate::types::LogLevel;

/// How long to wait for buffered progress lines after a run ends.
const PROGRESS_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - runner config and sequence loading
/// - the CLI and REST adapters
/// - dispatcher and executor
/// - a stdout printer for progress lines
pub async fn run(args: CliArgs, log_level: LogLevel) -> Result<()> {
    let cfg = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading runner config {}", path.display()))?,
        None => {
            let path = default_config_path();
            load_config_or_default(&path)
                .with_context(|| format!("loading runner config {}", path.display()))?
        }
    };
    let sequence = load_sequence(&args.sequence)
        .with_context(|| format!("loading sequence {}", args.sequence.display()))?;

    if args.dry_run {
        print_dry_run(&sequence);
        return Ok(());
    }

    let context = build_context(&args, log_level);
    let dispatcher = build_dispatcher(&cfg);

    let (subscriber, mut progress_rx) = ProgressSubscriber::channel();
    let printer = tokio::spawn(async move {
        while let Some(line) = progress_rx.recv().await {
            println!("{}", line.trim_end_matches('\n'));
        }
    });

    let mut executor =
        SequenceExecutor::new(sequence, context, dispatcher).with_progress(subscriber);
    let result = executor.execute().await;

    // Dropping the executor releases the last subscriber handles.
    drop(executor);
    if tokio::time::timeout(PROGRESS_DRAIN_TIMEOUT, printer).await.is_err() {
        warn!("progress printer did not finish; dropping remaining lines");
    }

    let report = result?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Sequence '{}' completed in {}s ({} groups, {} steps)",
            report.sequence,
            report.elapsed_display(),
            report.groups,
            report.steps
        );
    }

    Ok(())
}

fn build_context(args: &CliArgs, log_level: LogLevel) -> ExecutionContext {
    let mut ctx =
        ExecutionContext::new(&args.target_org, &args.project_path).with_log_level(log_level);
    if let Some(devhub) = &args.devhub {
        ctx = ctx.with_devhub(devhub);
    }
    if let Some(path) = &args.config_path {
        ctx = ctx.with_config_path(path);
    }
    if let Some(path) = &args.mdapi_source_path {
        ctx = ctx.with_mdapi_source_path(path);
    }
    if let Some(path) = &args.data_path {
        ctx = ctx.with_data_path(path);
    }
    ctx
}

/// Production adapters configured from `[runner]` and `[auth]`.
pub fn build_dispatcher(cfg: &ConfigFile) -> StepDispatcher<SfCliAdapter, SalesforceRestAdapter> {
    let runner = &cfg.runner;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    let store = CredentialStore::new(
        cfg.auth.resolved_auth_dir(),
        cfg.auth.api_version.clone(),
        Arc::clone(&fs),
    );

    let cli = SfCliAdapter::new(runner.cli_binary.clone())
        .with_heartbeat_interval(runner.heartbeat_interval)
        .with_timeout(runner.command_timeout)
        .with_failure_policy(runner.failure_policy);
    let rest = SalesforceRestAdapter::new(Arc::new(store))
        .with_heartbeat_interval(runner.heartbeat_interval)
        .with_timeout(runner.command_timeout);

    debug!(
        cli_binary = %runner.cli_binary,
        failure_policy = ?runner.failure_policy,
        timeout = ?runner.command_timeout,
        "adapters configured"
    );

    StepDispatcher::new(cli, rest, fs).with_settle_interval(runner.settle_interval)
}

/// Simple dry-run output: print groups, steps and their resolved actions.
fn print_dry_run(sequence: &CommandSequence) {
    println!("orgseq dry-run");
    println!("  sequence = {}", sequence.name);
    if !sequence.version.is_empty() {
        println!("  version = {}", sequence.version);
    }
    if !sequence.description.is_empty() {
        println!("  description = {}", sequence.description);
    }
    println!();

    if let Err(e) = crate::config::validate_sequence(sequence) {
        println!("  invalid: {e}");
    }

    println!("groups ({}):", sequence.groups.len());
    for group in &sequence.groups {
        println!("  - {}", group.name);
        for step in &group.steps {
            match StepAction::parse(step, &sequence.options) {
                Ok(action) => println!("      {} [{}]", step.name, action.kind()),
                Err(e) => println!("      {} [invalid: {e}]", step.name),
            }
        }
    }

    debug!("dry-run complete (no execution)");
}
