// src/exec/process.rs

//! CLI adapter: runs one `CliCommand` as a child process.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{Result, SequenceError};
use crate::exec::backend::{AdapterFuture, CommandAdapter, StepProgress};
use crate::exec::command::CliCommand;
use crate::progress::{format_progress, HeartbeatGuard, ProgressSubscriber, StatusTimer};
use crate::types::FailurePolicy;

/// Spawns CLI commands through the platform shell.
#[derive(Debug, Clone)]
pub struct SfCliAdapter {
    binary: String,
    heartbeat_interval: Duration,
    timeout: Option<Duration>,
    policy: FailurePolicy,
}

impl SfCliAdapter {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            heartbeat_interval: Duration::from_secs(1),
            timeout: None,
            policy: FailurePolicy::default(),
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

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn run_command(&self, def: CliCommand, progress: &StepProgress) -> Result<String> {
        let line = def.render(&self.binary);
        let structured = def.is_structured();

        info!(command = %def.command, structured, "starting CLI command");
        debug!(%line, "rendered command line");

        let mut cmd = shell_command(&line);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so a timeout also reaches whatever the shell
        // started in the background.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            SequenceError::CommandFailed(format!("spawning '{}': {e}", def.command))
        })?;
        let pid = child.id();

        let timer = StatusTimer::started();

        // Structured output is collected silently; heartbeats stand in for it.
        let _heartbeat = if structured {
            let handle = progress.notifier.start(
                def.progress_msg.clone(),
                self.heartbeat_interval,
                timer,
                progress.subscriber.clone(),
            );
            Some(HeartbeatGuard::new(progress.notifier.clone(), handle))
        } else {
            if !def.progress_msg.is_empty() {
                progress.push(format_progress(&timer, &def.progress_msg));
            }
            None
        };

        let mut stdout_task = child.stdout.take().map(|out| {
            let forward = (!structured).then(|| progress.subscriber.clone()).flatten();
            spawn_collector(out, forward)
        });
        let mut stderr_task = child.stderr.take().map(|err| {
            let forward = progress
                .verbose
                .then(|| progress.subscriber.clone())
                .flatten();
            spawn_collector(err, forward)
        });

        // The limit covers the exit and both pipes reaching EOF: a background
        // process can hold the pipes open after the shell itself has exited.
        let finished = match self.timeout {
            Some(limit) => tokio::time::timeout(
                limit,
                wait_and_drain(&mut child, &mut stdout_task, &mut stderr_task),
            )
            .await
            .map_err(|_| limit),
            None => Ok(wait_and_drain(&mut child, &mut stdout_task, &mut stderr_task).await),
        };

        let (status, stdout, stderr) = match finished {
            Ok(result) => result?,
            Err(limit) => {
                warn!(command = %def.command, ?limit, "command timed out; killing process group");
                kill_process_tree(&mut child, pid).await;
                for task in [stdout_task.take(), stderr_task.take()].into_iter().flatten() {
                    task.abort();
                }
                return Err(SequenceError::Timeout(limit));
            }
        };
        let code = status.code();

        info!(
            command = %def.command,
            exit_code = ?code,
            stderr_bytes = stderr.len(),
            elapsed = %timer.elapsed_display(),
            "CLI command exited"
        );

        if self.policy.is_failure(&stderr, code) {
            let detail = if stderr.trim().is_empty() {
                match code {
                    Some(c) => format!("process exited with code {c}"),
                    None => "process terminated by signal".to_string(),
                }
            } else {
                stderr.trim().to_string()
            };
            let message = if def.error_msg.is_empty() {
                detail
            } else {
                format!("{}: {}", def.error_msg, detail)
            };
            return Err(SequenceError::CommandFailed(message));
        }

        if !def.success_msg.is_empty() {
            progress.push(format_progress(&timer, &def.success_msg));
        }

        Ok(stdout)
    }
}

impl CommandAdapter for SfCliAdapter {
    type Definition = CliCommand;
    type Output = String;

    fn run<'a>(
        &'a self,
        definition: CliCommand,
        progress: &'a StepProgress,
    ) -> AdapterFuture<'a, String> {
        Box::pin(self.run_command(definition, progress))
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Wait for the process to exit and both collectors to reach EOF.
async fn wait_and_drain(
    child: &mut Child,
    stdout_task: &mut Option<JoinHandle<Vec<u8>>>,
    stderr_task: &mut Option<JoinHandle<Vec<u8>>>,
) -> Result<(ExitStatus, String, String)> {
    let status = child.wait().await?;
    let stdout = join_collector(stdout_task).await?;
    let stderr = join_collector(stderr_task).await?;
    Ok((status, stdout, stderr))
}

/// Kill the shell and everything left in its process group.
async fn kill_process_tree(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid.and_then(|p| i32::try_from(p).ok()) {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            debug!(pid, error = %e, "process group already gone");
        }
    }
    #[cfg(not(unix))]
    let _ = pid;

    if let Err(e) = child.kill().await {
        debug!(error = %e, "shell already exited");
    }
}

/// Drain a pipe into raw bytes, optionally forwarding text as it arrives.
///
/// Forwarded chunks never split a UTF-8 sequence: an incomplete tail is held
/// back until the next read completes it.
fn spawn_collector<R>(mut reader: R, forward: Option<ProgressSubscriber>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut collected = Vec::new();
        let mut pending = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => {
                    collected.extend_from_slice(&buf[..n]);
                    if let Some(sub) = &forward {
                        pending.extend_from_slice(&buf[..n]);
                        let text = take_complete_utf8(&mut pending);
                        if !text.is_empty() {
                            sub.push(text);
                        }
                    }
                }
                Err(e) => {
                    debug!(error = %e, "pipe read failed; stopping collector");
                    break;
                }
            }
        }
        if let Some(sub) = &forward {
            if !pending.is_empty() {
                sub.push(String::from_utf8_lossy(&pending).into_owned());
            }
        }
        collected
    })
}

/// Decode the complete prefix of `pending`, leaving an unfinished trailing
/// sequence in place.
fn take_complete_utf8(pending: &mut Vec<u8>) -> String {
    let complete = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => pending.len(),
    };
    let tail = pending.split_off(complete);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = tail;
    text
}

async fn join_collector(task: &mut Option<JoinHandle<Vec<u8>>>) -> Result<String> {
    match task.as_mut() {
        Some(handle) => handle
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .map_err(|e| SequenceError::Other(anyhow::anyhow!("output collector failed: {e}"))),
        None => Ok(String::new()),
    }
}
