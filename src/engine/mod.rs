// src/engine/mod.rs

//! Sequence execution engine.
//!
//! - [`context`] holds the `ExecutionContext` shared by every step.
//! - [`action`] turns a step's free-form options into a typed `StepAction`.
//! - [`dispatcher`] maps each action onto CLI and REST adapter calls.
//! - [`executor`] walks groups and steps in order and owns the run's timer
//!   and heartbeats.
//! - [`report`] is the `StatusReport` returned by a successful run.

pub mod action;
pub mod context;
pub mod dispatcher;
pub mod executor;
pub mod report;

pub use action::{StepAction, UserDefinition};
pub use context::ExecutionContext;
pub use dispatcher::StepDispatcher;
pub use executor::{ExecutorState, SequenceExecutor};
pub use report::StatusReport;
