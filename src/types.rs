use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The closed set of actions a sequence step may request.
///
/// Adding a kind means adding a parser in `engine::action` and a handler in
/// `engine::dispatcher`; both match exhaustively on this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    InstallPackage,
    DeployMetadata,
    ImportDataTree,
    CreateUser,
    ConfigureAdminUser,
    DeleteScratchOrg,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::InstallPackage,
        ActionKind::DeployMetadata,
        ActionKind::ImportDataTree,
        ActionKind::CreateUser,
        ActionKind::ConfigureAdminUser,
        ActionKind::DeleteScratchOrg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::InstallPackage => "install-package",
            ActionKind::DeployMetadata => "deploy-metadata",
            ActionKind::ImportDataTree => "import-data-tree",
            ActionKind::CreateUser => "create-user",
            ActionKind::ConfigureAdminUser => "configure-admin-user",
            ActionKind::DeleteScratchOrg => "delete-scratch-org",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; surrounding whitespace is ignored.
impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| format!("unknown action: {}", s.trim()))
    }
}

/// How the CLI adapter decides whether a finished process failed.
///
/// - `Stderr`: any output on stderr is a failure; the exit code is ignored.
/// - `ExitCode`: a non-zero exit code is a failure; stderr is only used as
///   error text.
/// - `Either`: fail if either signal fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    Stderr,
    ExitCode,
    Either,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        FailurePolicy::Stderr
    }
}

impl FailurePolicy {
    /// Any stderr byte counts, whitespace included.
    pub fn is_failure(&self, stderr: &str, exit_code: Option<i32>) -> bool {
        let stderr_failed = !stderr.is_empty();
        let exit_failed = exit_code != Some(0);
        match self {
            FailurePolicy::Stderr => stderr_failed,
            FailurePolicy::ExitCode => exit_failed,
            FailurePolicy::Either => stderr_failed || exit_failed,
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stderr" => Ok(FailurePolicy::Stderr),
            "exit-code" | "exit_code" => Ok(FailurePolicy::ExitCode),
            "either" => Ok(FailurePolicy::Either),
            other => Err(format!(
                "invalid failure_policy: {other} (expected \"stderr\", \"exit-code\" or \"either\")"
            )),
        }
    }
}

/// Log level, exposed on the CLI and carried in the execution context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl LogLevel {
    pub fn is_verbose(&self) -> bool {
        *self >= LogLevel::Debug
    }
}
