// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::types::FailurePolicy;

/// Free-form key/value bag attached to sequences and steps.
pub type OptionBag = Map<String, Value>;

/// A declarative build sequence, as read from a JSON (or TOML) document.
///
/// ```json
/// {
///   "name": "demo-build",
///   "version": "1.0.0",
///   "description": "Builds the demo org",
///   "groups": [
///     { "name": "Install packages",
///       "steps": [
///         { "name": "Install base package",
///           "action": "install-package",
///           "options": { "packageName": "Base", "packageVersionId": "04t..." } }
///       ] }
///   ]
/// }
/// ```
///
/// Loading only checks shape. Run-time invariants (non-empty groups, known
/// actions, required options) are enforced by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSequence {
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Groups in document order.
    #[serde(default)]
    pub groups: Vec<SequenceGroup>,

    /// Sequence-wide defaults, merged under each step's own options.
    #[serde(default)]
    pub options: OptionBag,
}

/// A named, ordered batch of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceGroup {
    pub name: String,

    #[serde(default)]
    pub steps: Vec<SequenceStep>,
}

/// One action invocation and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceStep {
    pub name: String,

    /// Action key, matched case-insensitively against `ActionKind`.
    pub action: String,

    #[serde(default)]
    pub options: OptionBag,
}

/// Top-level runner configuration as read from `Orgseq.toml`.
///
/// ```toml
/// [runner]
/// cli_binary = "sf"
/// heartbeat_interval = "1s"
/// settle_interval = "3s"
/// command_timeout = "30m"
/// failure_policy = "stderr"
///
/// [auth]
/// api_version = "59.0"
/// auth_dir = "/home/me/.sfdx"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub runner: RunnerSection,

    #[serde(default)]
    pub auth: AuthSection,
}

/// `[runner]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    /// Executable that CLI commands are rendered against.
    #[serde(default = "default_cli_binary")]
    pub cli_binary: String,

    /// Interval between progress heartbeats.
    #[serde(
        default = "default_heartbeat_interval",
        deserialize_with = "de_duration"
    )]
    pub heartbeat_interval: Duration,

    /// Pause after each step so the last progress line stays visible.
    #[serde(default = "default_settle_interval", deserialize_with = "de_duration")]
    pub settle_interval: Duration,

    /// Upper bound for a single CLI process or REST call. Unset means the
    /// adapters wait indefinitely.
    #[serde(default, deserialize_with = "de_opt_duration")]
    pub command_timeout: Option<Duration>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_cli_binary() -> String {
    "sf".to_string()
}

fn default_heartbeat_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_settle_interval() -> Duration {
    Duration::from_secs(3)
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            cli_binary: default_cli_binary(),
            heartbeat_interval: default_heartbeat_interval(),
            settle_interval: default_settle_interval(),
            command_timeout: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// `[auth]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthSection {
    /// REST API version used to build data endpoint URLs.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Directory holding the local auth cache. Defaults to `~/.sfdx`.
    #[serde(default)]
    pub auth_dir: Option<PathBuf>,
}

fn default_api_version() -> String {
    "59.0".to_string()
}

impl Default for AuthSection {
    fn default() -> Self {
        Self {
            api_version: default_api_version(),
            auth_dir: None,
        }
    }
}

impl AuthSection {
    pub fn resolved_auth_dir(&self) -> PathBuf {
        match &self.auth_dir {
            Some(dir) => dir.clone(),
            None => home::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".sfdx"),
        }
    }
}

fn de_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw).map_err(serde::de::Error::custom)
}

fn de_opt_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|s| parse_duration(&s).map_err(serde::de::Error::custom))
        .transpose()
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 60 * 60)),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
