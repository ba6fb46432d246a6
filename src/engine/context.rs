// src/engine/context.rs

use std::path::{Path, PathBuf};

use crate::progress::ProgressSubscriber;
use crate::types::LogLevel;

/// Target and filesystem layout shared by every step of a run.
///
/// The shared instance is read-only during a run. The dispatcher hands each
/// handler a copy carrying that step's progress subscriber.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub target_org_alias: String,
    pub devhub_alias: Option<String>,
    pub project_path: PathBuf,
    /// Directory holding definition files (e.g. user definitions).
    pub config_path: PathBuf,
    /// Directory holding MDAPI source folders.
    pub mdapi_source_path: PathBuf,
    /// Directory holding data import plans.
    pub data_path: PathBuf,
    pub log_level: LogLevel,
    /// Set on per-step copies only.
    pub progress: Option<ProgressSubscriber>,
}

impl ExecutionContext {
    /// Context with the conventional layout under `project_path`:
    /// `config/`, `mdapi-source/` and `data/`.
    pub fn new(target_org_alias: impl Into<String>, project_path: impl AsRef<Path>) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        Self {
            target_org_alias: target_org_alias.into(),
            devhub_alias: None,
            config_path: project_path.join("config"),
            mdapi_source_path: project_path.join("mdapi-source"),
            data_path: project_path.join("data"),
            project_path,
            log_level: LogLevel::default(),
            progress: None,
        }
    }

    pub fn with_devhub(mut self, alias: impl Into<String>) -> Self {
        self.devhub_alias = Some(alias.into());
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    pub fn with_mdapi_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.mdapi_source_path = path.into();
        self
    }

    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Copy of this context carrying a step's subscriber.
    pub fn for_step(&self, subscriber: Option<ProgressSubscriber>) -> Self {
        let mut ctx = self.clone();
        ctx.progress = subscriber;
        ctx
    }
}
