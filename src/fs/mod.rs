// src/fs/mod.rs

//! Read-only filesystem access for step handlers and the credential store.
//!
//! Handlers read user definition files and check source directories through
//! this trait so tests can run them against [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

pub mod mock;

/// Abstract filesystem interface.
pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("reading file {:?}", path))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(fs: &dyn FileSystem, path: &Path) -> Result<T> {
    let contents = fs.read_to_string(path)?;
    serde_json::from_str(&contents).with_context(|| format!("parsing JSON in {:?}", path))
}
