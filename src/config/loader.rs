// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{CommandSequence, ConfigFile};
use crate::errors::{Result, SequenceError};

/// Load a sequence definition from disk.
///
/// `.toml` files are parsed as TOML; anything else is parsed as JSON. This
/// only performs deserialization; run-time invariants are checked by the
/// executor when the sequence is run.
pub fn load_sequence(path: impl AsRef<Path>) -> Result<CommandSequence> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let sequence: CommandSequence = if is_toml(path) {
        toml::from_str(&contents)?
    } else {
        serde_json::from_str(&contents)?
    };

    debug!(
        path = %path.display(),
        sequence = %sequence.name,
        groups = sequence.groups.len(),
        "loaded sequence definition"
    );

    Ok(sequence)
}

/// Load the runner configuration from a path the user named.
///
/// The file must exist.
pub fn load_config(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;
    let config: ConfigFile = toml::from_str(&contents)?;
    check_config(&config)?;

    Ok(config)
}

/// Load the runner configuration from its default location.
///
/// A missing file yields the defaults, so `Orgseq.toml` is optional.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no runner config found; using defaults");
        return Ok(ConfigFile::default());
    }
    load_config(path)
}

fn check_config(config: &ConfigFile) -> Result<()> {
    if config.runner.cli_binary.trim().is_empty() {
        return Err(SequenceError::ConfigError(
            "runner.cli_binary must not be empty".to_string(),
        ));
    }
    if config.runner.heartbeat_interval.is_zero() {
        return Err(SequenceError::ConfigError(
            "runner.heartbeat_interval must be greater than zero".to_string(),
        ));
    }
    if config.auth.api_version.trim().is_empty() {
        return Err(SequenceError::ConfigError(
            "auth.api_version must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Default location of the runner config, relative to the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Orgseq.toml")
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("toml"))
}
