// src/exec/command.rs

//! Declarative CLI command definitions and their rendering to a command line.

use std::fmt;

/// External commands the engine knows how to invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfCommand {
    PackageInstall,
    ProjectDeployStart,
    DataImportTree,
    OrgDeleteScratch,
    AliasSet,
}

impl SfCommand {
    /// Subcommand words following the binary name.
    pub fn words(&self) -> &'static str {
        match self {
            SfCommand::PackageInstall => "package install",
            SfCommand::ProjectDeployStart => "project deploy start",
            SfCommand::DataImportTree => "data import tree",
            SfCommand::OrgDeleteScratch => "org delete scratch",
            SfCommand::AliasSet => "alias set",
        }
    }
}

impl fmt::Display for SfCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.words())
    }
}

/// Typed flag value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for FlagValue {
    fn from(v: &str) -> Self {
        FlagValue::Str(v.to_string())
    }
}

impl From<String> for FlagValue {
    fn from(v: String) -> Self {
        FlagValue::Str(v)
    }
}

impl From<i64> for FlagValue {
    fn from(v: i64) -> Self {
        FlagValue::Int(v)
    }
}

impl From<bool> for FlagValue {
    fn from(v: bool) -> Self {
        FlagValue::Bool(v)
    }
}

/// Flag that switches the CLI to machine-readable output.
pub const JSON_FLAG: &str = "json";

/// One external command invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct CliCommand {
    pub command: SfCommand,
    pub progress_msg: String,
    pub error_msg: String,
    pub success_msg: String,
    /// Positional arguments, rendered before the flags.
    pub args: Vec<String>,
    /// Flags in rendering order.
    pub flags: Vec<(String, FlagValue)>,
}

impl CliCommand {
    pub fn new(command: SfCommand) -> Self {
        Self {
            command,
            progress_msg: String::new(),
            error_msg: String::new(),
            success_msg: String::new(),
            args: Vec::new(),
            flags: Vec::new(),
        }
    }

    pub fn messages(
        mut self,
        progress: impl Into<String>,
        error: impl Into<String>,
        success: impl Into<String>,
    ) -> Self {
        self.progress_msg = progress.into();
        self.error_msg = error.into();
        self.success_msg = success.into();
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn flag(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.flags.push((name.into(), value.into()));
        self
    }

    pub fn flag_value(&self, name: &str) -> Option<&FlagValue> {
        self.flags.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// True when the command was asked for machine-readable output.
    pub fn is_structured(&self) -> bool {
        matches!(self.flag_value(JSON_FLAG), Some(FlagValue::Bool(true)))
    }

    /// Render into a single command line for `binary`.
    ///
    /// - `true` booleans render as bare switches, `false` ones are omitted.
    /// - single-character names use one hyphen (`-a`), others two.
    /// - values containing whitespace or shell metacharacters are quoted.
    pub fn render(&self, binary: &str) -> String {
        let mut parts: Vec<String> = vec![binary.to_string(), self.command.words().to_string()];

        for arg in &self.args {
            parts.push(quote_if_needed(arg));
        }

        for (name, value) in &self.flags {
            let switch = render_flag_name(name);
            match value {
                FlagValue::Bool(true) => parts.push(switch),
                FlagValue::Bool(false) => {}
                FlagValue::Str(s) => {
                    parts.push(switch);
                    parts.push(quote_if_needed(s));
                }
                FlagValue::Int(n) => {
                    parts.push(switch);
                    parts.push(n.to_string());
                }
            }
        }

        parts.join(" ")
    }
}

fn render_flag_name(name: &str) -> String {
    if name.chars().count() == 1 {
        format!("-{name}")
    } else {
        format!("--{name}")
    }
}

/// Double-quote a value when the shell would otherwise split or expand it.
pub fn quote_if_needed(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '$' | '`' | '\\' | ';' | '&' | '|' | '<' | '>' | '(' | ')' | '*' | '?'));
    if !needs_quotes {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '$' | '`' | '\\') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}
