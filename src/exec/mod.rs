// src/exec/mod.rs

//! Execution backends.
//!
//! - [`backend`] provides the `CommandAdapter` trait the dispatcher depends
//!   on, plus the per-step `StepProgress` plumbing.
//! - [`command`] defines `CliCommand` and its rendering to a command line.
//! - [`process`] runs a `CliCommand` as a child process (`SfCliAdapter`).
//! - [`auth`] resolves org aliases to connections from the local auth cache.
//! - [`rest`] issues a `RestCommand` over HTTPS (`SalesforceRestAdapter`).

pub mod auth;
pub mod backend;
pub mod command;
pub mod process;
pub mod rest;

pub use auth::{Connection, ConnectionSource, CredentialStore};
pub use backend::{AdapterFuture, CommandAdapter, StepProgress};
pub use command::{CliCommand, FlagValue, SfCommand};
pub use process::SfCliAdapter;
pub use rest::{Method, OrgTarget, RestCommand, RestRequest, SalesforceRestAdapter};
