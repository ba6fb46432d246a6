// src/progress/mod.rs

//! Progress reporting for a sequence run.
//!
//! - [`timer`] provides `StatusTimer`, the wall-clock start/stop/elapsed value
//!   used by the executor report and by heartbeats.
//! - [`notifier`] owns recurring heartbeats that push
//!   `"[{elapsed}s] {message}"` lines to an optional subscriber.
//!
//! A `ProgressSubscriber` is a push-only sink of plain-text lines. Nothing in
//! the engine depends on anyone reading from it.

pub mod notifier;
pub mod timer;

pub use notifier::{HeartbeatGuard, HeartbeatHandle, NotifierScope, ProgressNotifier};
pub use timer::StatusTimer;

use tokio::sync::mpsc;

/// Push-only sink for progress lines.
#[derive(Debug, Clone)]
pub struct ProgressSubscriber {
    tx: mpsc::UnboundedSender<String>,
}

impl ProgressSubscriber {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Create a subscriber together with the receiving end of its stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push one line. A closed receiver is ignored.
    pub fn push(&self, line: impl Into<String>) {
        let _ = self.tx.send(line.into());
    }
}

/// Push to an optional subscriber; no-op when there is none.
pub fn notify(subscriber: Option<&ProgressSubscriber>, line: impl Into<String>) {
    if let Some(sub) = subscriber {
        sub.push(line);
    }
}

/// Render a progress line for the given timer.
pub fn format_progress(timer: &StatusTimer, message: &str) -> String {
    format!("[{}s] {}", timer.elapsed_display(), message)
}
