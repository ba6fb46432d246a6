// src/exec/rest.rs

//! REST adapter: issues one authenticated call against an org's REST API.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

pub use reqwest::Method;

use crate::errors::{Result, SequenceError};
use crate::exec::auth::{Connection, ConnectionSource};
use crate::exec::backend::{AdapterFuture, CommandAdapter, StepProgress};
use crate::progress::{format_progress, HeartbeatGuard, StatusTimer};

/// Which org a call goes to.
#[derive(Debug, Clone)]
pub enum OrgTarget {
    /// Resolved through the connection cache, authenticating on first use.
    Alias(String),
    /// Used as-is, without re-authenticating.
    Connection(Arc<Connection>),
}

/// A single HTTP request.
///
/// `url` is resolved against the org:
/// - absolute `http(s)://` URLs are used unchanged,
/// - paths starting with `/services/` are relative to the instance URL,
/// - anything else is relative to the versioned data API
///   (`/services/data/vXX.X`).
#[derive(Debug, Clone, PartialEq)]
pub struct RestRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RestRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn patch(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, url).with_body(body)
    }

    /// `GET /query?q=<soql>`.
    pub fn query(soql: impl Into<String>) -> Self {
        let mut req = Self::get("/query");
        req.query.push(("q".to_string(), soql.into()));
        req
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// One REST invocation.
#[derive(Debug, Clone)]
pub struct RestCommand {
    pub target: OrgTarget,
    pub request: RestRequest,
    pub progress_msg: String,
    pub error_msg: String,
    pub success_msg: String,
}

impl RestCommand {
    pub fn new(target: OrgTarget, request: RestRequest) -> Self {
        Self {
            target,
            request,
            progress_msg: String::new(),
            error_msg: String::new(),
            success_msg: String::new(),
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
}

/// Issues REST calls, caching one connection per alias.
#[derive(Debug)]
pub struct SalesforceRestAdapter {
    client: Client,
    source: Arc<dyn ConnectionSource>,
    connections: Mutex<HashMap<String, Arc<Connection>>>,
    heartbeat_interval: Duration,
    timeout: Option<Duration>,
}

impl SalesforceRestAdapter {
    pub fn new(source: Arc<dyn ConnectionSource>) -> Self {
        Self {
            client: Client::new(),
            source,
            connections: Mutex::new(HashMap::new()),
            heartbeat_interval: Duration::from_secs(1),
            timeout: None,
        }
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a target to a connection, authenticating at most once per alias.
    pub fn resolve(&self, target: &OrgTarget) -> Result<Arc<Connection>> {
        let alias = match target {
            OrgTarget::Connection(conn) => return Ok(Arc::clone(conn)),
            OrgTarget::Alias(alias) => alias,
        };

        let mut cache = self
            .connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(conn) = cache.get(alias) {
            debug!(%alias, "reusing cached connection");
            return Ok(Arc::clone(conn));
        }

        let conn = Arc::new(self.source.connect(alias)?);
        info!(%alias, username = %conn.username, "authenticated connection");
        cache.insert(alias.clone(), Arc::clone(&conn));
        Ok(conn)
    }

    /// Number of cached connections.
    pub fn cached_connections(&self) -> usize {
        self.connections
            .lock()
            .map(|c| c.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    async fn call(&self, def: RestCommand, progress: &StepProgress) -> Result<Value> {
        let conn = self.resolve(&def.target)?;
        let url = resolve_url(&conn, &def.request.url);

        info!(method = %def.request.method, %url, "issuing REST call");

        let timer = StatusTimer::started();
        let _heartbeat = (!def.progress_msg.is_empty()).then(|| {
            let handle = progress.notifier.start(
                def.progress_msg.clone(),
                self.heartbeat_interval,
                timer,
                progress.subscriber.clone(),
            );
            HeartbeatGuard::new(progress.notifier.clone(), handle)
        });

        let mut request = self
            .client
            .request(def.request.method.clone(), &url)
            .bearer_auth(&conn.access_token);
        if !def.request.query.is_empty() {
            request = request.query(&def.request.query);
        }
        if let Some(body) = &def.request.body {
            request = request.json(body);
        }
        if let Some(limit) = self.timeout {
            request = request.timeout(limit);
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_transport(e))?;

        debug!(status = status.as_u16(), bytes = text.len(), elapsed = %timer.elapsed_display(), "REST call finished");

        if !status.is_success() {
            return Err(SequenceError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        if !def.success_msg.is_empty() {
            progress.push(format_progress(&timer, &def.success_msg));
        }

        Ok(parse_body(&text))
    }

    fn map_transport(&self, err: reqwest::Error) -> SequenceError {
        match self.timeout {
            Some(limit) if err.is_timeout() => SequenceError::Timeout(limit),
            _ => SequenceError::Request(err),
        }
    }
}

impl CommandAdapter for SalesforceRestAdapter {
    type Definition = RestCommand;
    type Output = Value;

    fn run<'a>(
        &'a self,
        definition: RestCommand,
        progress: &'a StepProgress,
    ) -> AdapterFuture<'a, Value> {
        Box::pin(self.call(definition, progress))
    }
}

fn resolve_url(conn: &Connection, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with("/services/") {
        format!("{}{}", conn.instance_url.trim_end_matches('/'), url)
    } else if url.starts_with('/') {
        format!("{}{}", conn.data_url(), url)
    } else {
        format!("{}/{}", conn.data_url(), url)
    }
}

/// Empty bodies (e.g. `204 No Content`) become `null`; non-JSON text is
/// returned as a string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}
