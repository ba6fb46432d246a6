// src/config/mod.rs

//! Sequence definitions and runner configuration.
//!
//! Responsibilities:
//! - Define the serde-backed data model (`model.rs`).
//! - Load sequences (JSON/TOML) and the runner config (TOML) (`loader.rs`).
//! - Check structural sequence invariants (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_config, load_config_or_default, load_sequence};
pub use model::{
    AuthSection, CommandSequence, ConfigFile, OptionBag, RunnerSection, SequenceGroup,
    SequenceStep,
};
pub use validate::validate_sequence;
