use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use orgseq::errors::SequenceError;
use orgseq::exec::{
    AdapterFuture, CliCommand, CommandAdapter, Method, RestCommand, SfCommand, StepProgress,
};
use orgseq::progress::StatusTimer;

/// Ordered record of every adapter call, shared by both fakes.
///
/// CLI calls are logged as `"cli:<command words>"`, REST calls as
/// `"rest:<METHOD> <url>"`.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What a scripted command does instead of succeeding.
#[derive(Debug, Clone)]
enum Script {
    /// Fail with this stderr.
    Fail(String),
    /// Register a heartbeat without a guard, then fail with this stderr.
    LeakHeartbeatThenFail(String),
    /// Register a heartbeat without a guard, then never return.
    LeakHeartbeatThenHang,
}

/// A fake CLI adapter that:
/// - records every `CliCommand` it receives
/// - succeeds with `{"status": 0}` unless scripted for a command, in which
///   case it fails the way the real adapter does on stderr output, or
///   leaves a heartbeat registered for the executor to clean up.
#[derive(Debug, Clone)]
pub struct FakeCliAdapter {
    calls: CallLog,
    commands: Arc<Mutex<Vec<CliCommand>>>,
    scripts: Arc<Mutex<Vec<(SfCommand, Script)>>>,
    heartbeats_started: Arc<Mutex<usize>>,
    delay: Duration,
}

impl FakeCliAdapter {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            commands: Arc::new(Mutex::new(Vec::new())),
            scripts: Arc::new(Mutex::new(Vec::new())),
            heartbeats_started: Arc::new(Mutex::new(0)),
            delay: Duration::from_millis(2),
        }
    }

    /// Make every invocation of `command` fail with `stderr`.
    pub fn fail_on(&self, command: SfCommand, stderr: &str) {
        self.script(command, Script::Fail(stderr.to_string()));
    }

    /// Make `command` start a heartbeat it never finishes, then fail.
    pub fn leak_heartbeat_then_fail(&self, command: SfCommand, stderr: &str) {
        self.script(command, Script::LeakHeartbeatThenFail(stderr.to_string()));
    }

    /// Make `command` start a heartbeat it never finishes, then hang forever.
    pub fn leak_heartbeat_then_hang(&self, command: SfCommand) {
        self.script(command, Script::LeakHeartbeatThenHang);
    }

    /// Heartbeats registered through the leaking scripts.
    pub fn heartbeats_started(&self) -> usize {
        *self.heartbeats_started.lock().unwrap()
    }

    fn script(&self, command: SfCommand, script: Script) {
        self.scripts.lock().unwrap().push((command, script));
    }

    fn leak_heartbeat(&self, definition: &CliCommand, progress: &StepProgress) {
        progress.notifier.start(
            definition.progress_msg.clone(),
            Duration::from_millis(20),
            StatusTimer::started(),
            progress.subscriber.clone(),
        );
        *self.heartbeats_started.lock().unwrap() += 1;
    }

    pub fn commands(&self) -> Vec<CliCommand> {
        self.commands.lock().unwrap().clone()
    }
}

impl CommandAdapter for FakeCliAdapter {
    type Definition = CliCommand;
    type Output = String;

    fn run<'a>(
        &'a self,
        definition: CliCommand,
        progress: &'a StepProgress,
    ) -> AdapterFuture<'a, String> {
        Box::pin(async move {
            self.calls.push(format!("cli:{}", definition.command.words()));
            self.commands.lock().unwrap().push(definition.clone());
            progress.push(format!("[0.000s] {}", definition.progress_msg));

            tokio::time::sleep(self.delay).await;

            let script = self
                .scripts
                .lock()
                .unwrap()
                .iter()
                .find(|(cmd, _)| *cmd == definition.command)
                .map(|(_, script)| script.clone());
            let stderr = match script {
                None => return Ok(json!({ "status": 0 }).to_string()),
                Some(Script::Fail(stderr)) => stderr,
                Some(Script::LeakHeartbeatThenFail(stderr)) => {
                    self.leak_heartbeat(&definition, progress);
                    stderr
                }
                Some(Script::LeakHeartbeatThenHang) => {
                    self.leak_heartbeat(&definition, progress);
                    std::future::pending::<String>().await
                }
            };
            Err(SequenceError::CommandFailed(format!(
                "{}: {}",
                definition.error_msg, stderr
            )))
        })
    }
}

/// A fake REST adapter that records requests and answers every call with a
/// response shaped to satisfy create, query and userinfo lookups, unless
/// scripted to fail for a method and URL prefix.
#[derive(Debug, Clone)]
pub struct FakeRestAdapter {
    calls: CallLog,
    commands: Arc<Mutex<Vec<RestCommand>>>,
    failures: Arc<Mutex<Vec<(Method, String, u16)>>>,
}

impl FakeRestAdapter {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            commands: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make calls whose method matches and whose URL starts with `url_prefix`
    /// fail with an HTTP error.
    pub fn fail_on(&self, method: Method, url_prefix: &str, status: u16) {
        self.failures
            .lock()
            .unwrap()
            .push((method, url_prefix.to_string(), status));
    }

    pub fn commands(&self) -> Vec<RestCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn canned_response() -> Value {
        json!({
            "id": "005000000000001AAA",
            "success": true,
            "user_id": "005000000000002AAA",
            "totalSize": 1,
            "records": [{ "Id": "0PS000000000001AAA" }]
        })
    }
}

impl CommandAdapter for FakeRestAdapter {
    type Definition = RestCommand;
    type Output = Value;

    fn run<'a>(
        &'a self,
        definition: RestCommand,
        _progress: &'a StepProgress,
    ) -> AdapterFuture<'a, Value> {
        Box::pin(async move {
            let request = &definition.request;
            self.calls
                .push(format!("rest:{} {}", request.method, request.url));
            self.commands.lock().unwrap().push(definition.clone());

            let failure = self
                .failures
                .lock()
                .unwrap()
                .iter()
                .find(|(m, prefix, _)| *m == request.method && request.url.starts_with(prefix.as_str()))
                .map(|(_, _, status)| *status);
            match failure {
                Some(status) => Err(SequenceError::Http {
                    status,
                    body: format!("[{{\"message\":\"scripted failure\",\"errorCode\":\"{status}\"}}]"),
                }),
                None => Ok(Self::canned_response()),
            }
        })
    }
}
