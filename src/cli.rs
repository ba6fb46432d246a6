// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::Parser;

use crate::types::LogLevel;

/// Command-line arguments for `orgseq`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "orgseq",
    version,
    about = "Run a declarative build sequence against a Salesforce org.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the sequence definition (JSON, or TOML by extension).
    #[arg(long, short = 's', value_name = "PATH")]
    pub sequence: PathBuf,

    /// Alias (or username) of the org the sequence runs against.
    #[arg(long, short = 't', value_name = "ALIAS")]
    pub target_org: String,

    /// Alias of the Dev Hub that owns the target scratch org.
    #[arg(long, value_name = "ALIAS")]
    pub devhub: Option<String>,

    /// Project root. Defaults to the current working directory.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub project_path: PathBuf,

    /// Directory with definition files. Default: `<project>/config`.
    #[arg(long, value_name = "DIR")]
    pub config_path: Option<PathBuf>,

    /// Directory with MDAPI source folders. Default: `<project>/mdapi-source`.
    #[arg(long, value_name = "DIR")]
    pub mdapi_source_path: Option<PathBuf>,

    /// Directory with data import plans. Default: `<project>/data`.
    #[arg(long, value_name = "DIR")]
    pub data_path: Option<PathBuf>,

    /// Runner configuration (TOML). Default: `Orgseq.toml` if present; a
    /// file named here must exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ORGSEQ_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and check the sequence, print its steps, but run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
