// src/exec/auth.rs

//! Resolve org aliases to authenticated connections from the local auth cache.
//!
//! The cache directory holds:
//! - `alias.json`: `{"orgs": {"<alias>": "<username>"}}`
//! - `<username>.json`: `{"accessToken": "...", "instanceUrl": "...", "username": "..."}`

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::errors::{Result, SequenceError};
use crate::fs::{read_json, FileSystem};

/// An authenticated session against one org.
#[derive(Clone, PartialEq, Eq)]
pub struct Connection {
    pub alias: String,
    pub username: String,
    pub instance_url: String,
    pub access_token: String,
    pub api_version: String,
}

impl Connection {
    /// Base URL of the versioned REST data API.
    pub fn data_url(&self) -> String {
        format!(
            "{}/services/data/v{}",
            self.instance_url.trim_end_matches('/'),
            self.api_version
        )
    }
}

// Keep the token out of logs.
impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("alias", &self.alias)
            .field("username", &self.username)
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Source of connections, keyed by alias or username.
pub trait ConnectionSource: Send + Sync + fmt::Debug {
    fn connect(&self, alias: &str) -> Result<Connection>;
}

#[derive(Debug, Deserialize)]
struct AliasFile {
    #[serde(default)]
    orgs: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthFile {
    access_token: Option<String>,
    instance_url: Option<String>,
    username: Option<String>,
}

/// Reads the local auth cache written by the CLI.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    auth_dir: PathBuf,
    api_version: String,
    fs: Arc<dyn FileSystem>,
}

impl CredentialStore {
    pub fn new(auth_dir: impl Into<PathBuf>, api_version: impl Into<String>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            auth_dir: auth_dir.into(),
            api_version: api_version.into(),
            fs,
        }
    }

    /// Map an alias to a username. Anything containing `@` is already one.
    pub fn username_for(&self, alias: &str) -> Result<String> {
        if alias.contains('@') {
            return Ok(alias.to_string());
        }

        let path = self.auth_dir.join("alias.json");
        let aliases: AliasFile = read_json(self.fs.as_ref(), &path)
            .map_err(|e| SequenceError::Auth(format!("reading alias file: {e:#}")))?;

        aliases
            .orgs
            .get(alias)
            .cloned()
            .ok_or_else(|| SequenceError::Auth(format!("no org is authorized under alias '{alias}'")))
    }
}

impl ConnectionSource for CredentialStore {
    fn connect(&self, alias: &str) -> Result<Connection> {
        let username = self.username_for(alias)?;
        let path = self.auth_dir.join(format!("{username}.json"));
        let auth: AuthFile = read_json(self.fs.as_ref(), &path).map_err(|e| {
            SequenceError::Auth(format!("reading auth info for '{username}': {e:#}"))
        })?;

        let access_token = auth
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SequenceError::Auth(format!("no access token stored for '{username}'")))?;
        let instance_url = auth
            .instance_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SequenceError::Auth(format!("no instance URL stored for '{username}'")))?;

        debug!(%alias, %username, %instance_url, "resolved connection from auth cache");

        Ok(Connection {
            alias: alias.to_string(),
            username: auth.username.unwrap_or(username),
            instance_url,
            access_token,
            api_version: self.api_version.clone(),
        })
    }
}
