// src/exec/backend.rs

//! Pluggable command adapter abstraction.
//!
//! The dispatcher talks to two `CommandAdapter`s instead of spawning
//! processes or issuing HTTP calls itself:
//!
//! - [`SfCliAdapter`](super::process::SfCliAdapter) runs a `CliCommand` as a child
//!   process and returns its stdout.
//! - [`SalesforceRestAdapter`](super::rest::SalesforceRestAdapter) issues a
//!   `RestCommand` against the org's REST API and returns the parsed body.
//!
//! Tests provide their own adapters that record definitions and answer from
//! a script, without touching processes or the network.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::errors::Result;
use crate::progress::{ProgressNotifier, ProgressSubscriber};

/// Boxed future returned by adapters.
pub type AdapterFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Capability interface shared by both execution backends.
pub trait CommandAdapter: Send + Sync {
    /// Declarative description of one invocation.
    type Definition: fmt::Debug + Send + 'static;
    /// What a successful invocation yields.
    type Output: Send + 'static;

    /// Execute one definition.
    ///
    /// Errors are returned as-is; the dispatcher adds step context.
    fn run<'a>(
        &'a self,
        definition: Self::Definition,
        progress: &'a StepProgress,
    ) -> AdapterFuture<'a, Self::Output>;
}

/// Per-step progress plumbing handed to adapters.
///
/// `notifier` belongs to the executor run, so any heartbeat an adapter
/// forgets to finish is still killed when the run ends.
#[derive(Debug, Clone, Default)]
pub struct StepProgress {
    pub subscriber: Option<ProgressSubscriber>,
    pub notifier: ProgressNotifier,
    /// Forward extra detail (e.g. stderr chunks) to the subscriber.
    pub verbose: bool,
}

impl StepProgress {
    pub fn new(
        subscriber: Option<ProgressSubscriber>,
        notifier: ProgressNotifier,
        verbose: bool,
    ) -> Self {
        Self {
            subscriber,
            notifier,
            verbose,
        }
    }

    pub fn push(&self, line: impl Into<String>) {
        crate::progress::notify(self.subscriber.as_ref(), line);
    }
}
