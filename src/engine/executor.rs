// src/engine/executor.rs

//! Sequence executor: walks groups and steps in document order.
//!
//! State machine: `Idle -> Running -> {Completed | Aborted}`.
//!
//! - Groups run strictly in order, and steps within a group strictly in
//!   order; a step starts only after the previous one has fully finished.
//! - The first failing step aborts the run. No report is produced; the error
//!   is returned with the step's action and name attached.
//! - On every exit path (success, failure, or the `execute` future being
//!   dropped) the status timer is stopped and every heartbeat registered
//!   during the run is killed. [`RunGuard`] owns that teardown.
//! - An executor runs once. A second `execute` call fails with
//!   `AlreadyExecuted`.

use serde_json::Value;
use tracing::{error, info};

use crate::config::{validate_sequence, CommandSequence};
use crate::engine::action::StepAction;
use crate::engine::context::ExecutionContext;
use crate::engine::dispatcher::StepDispatcher;
use crate::engine::report::StatusReport;
use crate::errors::{Result, SequenceError};
use crate::exec::{CliCommand, CommandAdapter, RestCommand};
use crate::progress::{NotifierScope, ProgressNotifier, ProgressSubscriber, StatusTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Running,
    Completed,
    Aborted,
}

pub struct SequenceExecutor<C, R> {
    sequence: CommandSequence,
    context: ExecutionContext,
    dispatcher: StepDispatcher<C, R>,
    subscriber: Option<ProgressSubscriber>,
    notifier: ProgressNotifier,
    timer: StatusTimer,
    state: ExecutorState,
}

impl<C, R> SequenceExecutor<C, R>
where
    C: CommandAdapter<Definition = CliCommand, Output = String>,
    R: CommandAdapter<Definition = RestCommand, Output = Value>,
{
    pub fn new(
        sequence: CommandSequence,
        context: ExecutionContext,
        dispatcher: StepDispatcher<C, R>,
    ) -> Self {
        Self {
            sequence,
            context,
            dispatcher,
            subscriber: None,
            notifier: ProgressNotifier::new(),
            timer: StatusTimer::new(),
            state: ExecutorState::Idle,
        }
    }

    /// Send progress lines for every step to `subscriber`.
    pub fn with_progress(mut self, subscriber: ProgressSubscriber) -> Self {
        self.subscriber = Some(subscriber);
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn timer(&self) -> &StatusTimer {
        &self.timer
    }

    /// Heartbeats registered by this run's adapters.
    pub fn notifier(&self) -> &ProgressNotifier {
        &self.notifier
    }

    /// Run the whole sequence.
    pub async fn execute(&mut self) -> Result<StatusReport> {
        if self.state != ExecutorState::Idle {
            return Err(SequenceError::AlreadyExecuted);
        }
        self.state = ExecutorState::Running;

        let Self {
            sequence,
            context,
            dispatcher,
            subscriber,
            notifier,
            timer,
            state,
        } = self;

        info!(sequence = %sequence.name, version = %sequence.version, "sequence started");

        let result = {
            let _guard = RunGuard::start(timer, notifier);
            run_sequence(sequence, context, dispatcher, subscriber.as_ref(), notifier).await
        };

        match result {
            Ok(()) => {
                *state = ExecutorState::Completed;
                let steps = sequence.groups.iter().map(|g| g.steps.len()).sum();
                let report =
                    StatusReport::from_timer(&sequence.name, timer, sequence.groups.len(), steps);
                info!(
                    sequence = %sequence.name,
                    elapsed = %report.elapsed_display(),
                    "sequence completed"
                );
                Ok(report)
            }
            Err(err) => {
                *state = ExecutorState::Aborted;
                error!(
                    sequence = %sequence.name,
                    elapsed = %timer.elapsed_display(),
                    error = %err,
                    "sequence aborted"
                );
                Err(err)
            }
        }
    }
}

/// Starts the timer on creation; stops it and kills all heartbeats on drop.
struct RunGuard<'a> {
    timer: &'a mut StatusTimer,
    _heartbeats: NotifierScope,
}

impl<'a> RunGuard<'a> {
    fn start(timer: &'a mut StatusTimer, notifier: &ProgressNotifier) -> Self {
        timer.start();
        Self {
            timer,
            _heartbeats: notifier.scope(),
        }
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop();
    }
}

async fn run_sequence<C, R>(
    sequence: &CommandSequence,
    context: &ExecutionContext,
    dispatcher: &StepDispatcher<C, R>,
    subscriber: Option<&ProgressSubscriber>,
    notifier: &ProgressNotifier,
) -> Result<()>
where
    C: CommandAdapter<Definition = CliCommand, Output = String>,
    R: CommandAdapter<Definition = RestCommand, Output = Value>,
{
    validate_sequence(sequence)?;
    preflight(sequence)?;

    let group_count = sequence.groups.len();
    for (index, group) in sequence.groups.iter().enumerate() {
        info!(
            group = %group.name,
            position = index + 1,
            of = group_count,
            steps = group.steps.len(),
            "group started"
        );

        for step in &group.steps {
            dispatcher
                .dispatch(step, &sequence.options, context, subscriber.cloned(), notifier)
                .await?;
        }

        info!(group = %group.name, "group finished");
    }

    Ok(())
}

/// Parse every step up front so configuration errors surface before the
/// first adapter call of the run.
pub fn preflight(sequence: &CommandSequence) -> Result<()> {
    for group in &sequence.groups {
        for step in &group.steps {
            StepAction::parse(step, &sequence.options)?;
        }
    }
    Ok(())
}
