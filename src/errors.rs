// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Variants follow the three failure classes of a run:
//! - configuration errors (detected before any external side effect),
//! - adapter errors (a CLI process or REST call failed),
//! - partial side effects (a multi-call handler failed half way).

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("sequence '{sequence}' has no groups")]
    NoGroups { sequence: String },

    #[error("group '{group}' has no steps")]
    EmptyGroup { group: String },

    #[error("step '{step}' requests unknown action '{action}'")]
    UnknownAction { step: String, action: String },

    #[error("step '{step}' ({action}) is missing required option '{option}'")]
    MissingOption {
        action: String,
        step: String,
        option: String,
    },

    #[error("step '{step}' ({action}) has invalid option '{option}': {reason}")]
    InvalidOption {
        action: String,
        step: String,
        option: String,
        reason: String,
    },

    #[error("sequence executor has already been run")]
    AlreadyExecuted,

    #[error("{action} failed in step '{step}': {message}")]
    Command {
        action: String,
        step: String,
        message: String,
    },

    #[error("{action} failed in step '{step}' after {applied}: {message}")]
    PartiallyApplied {
        action: String,
        step: String,
        applied: String,
        message: String,
    },

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SequenceError {
    /// True for errors raised before any adapter was invoked.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SequenceError::NoGroups { .. }
                | SequenceError::EmptyGroup { .. }
                | SequenceError::UnknownAction { .. }
                | SequenceError::MissingOption { .. }
                | SequenceError::InvalidOption { .. }
                | SequenceError::ConfigError(_)
        )
    }

    /// Wrap an adapter error with the step that raised it.
    ///
    /// Errors that already carry step context are returned unchanged.
    pub fn in_step(self, action: &str, step: &str) -> Self {
        if self.is_configuration()
            || matches!(
                self,
                SequenceError::Command { .. } | SequenceError::PartiallyApplied { .. }
            )
        {
            return self;
        }
        SequenceError::Command {
            action: action.to_string(),
            step: step.to_string(),
            message: self.to_string(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SequenceError>;
