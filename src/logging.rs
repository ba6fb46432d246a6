// src/logging.rs

//! Logging setup for `orgseq` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `ORGSEQ_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR; stdout carries progress lines and the report.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::types::LogLevel;

/// Resolve the effective level from the CLI flag and the environment.
pub fn resolve_level(cli_level: Option<LogLevel>) -> LogLevel {
    match cli_level {
        Some(lvl) => lvl,
        None => std::env::var("ORGSEQ_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or_default(),
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(level: LogLevel) -> Result<()> {
    fmt()
        .with_max_level(tracing_level(level))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn tracing_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

pub fn parse_level_str(s: &str) -> Option<LogLevel> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(LogLevel::Error),
        "warn" | "warning" => Some(LogLevel::Warn),
        "info" => Some(LogLevel::Info),
        "debug" => Some(LogLevel::Debug),
        "trace" => Some(LogLevel::Trace),
        _ => None,
    }
}
