// src/progress/notifier.rs

//! Recurring progress heartbeats.
//!
//! Each heartbeat is a Tokio task that ticks every `interval` and pushes
//! `"[{elapsed}s] {message}"` to its subscriber. The notifier keeps the join
//! handles of every live heartbeat so they can be cancelled one by one
//! (`finish`) or all at once (`kill_all`). An executor run owns one notifier
//! and holds a [`NotifierScope`] for the duration of the run, so no
//! heartbeat outlives the run on any exit path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::{format_progress, notify, ProgressSubscriber, StatusTimer};

/// Shortest interval a heartbeat will tick at.
const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Identifies one registered heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeartbeatHandle(u64);

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    live: HashMap<u64, JoinHandle<()>>,
}

/// Owner of a set of heartbeats. Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct ProgressNotifier {
    registry: Arc<Mutex<Registry>>,
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a heartbeat. Must be called from within a Tokio runtime.
    ///
    /// The first line is pushed after one `interval`, not immediately.
    pub fn start(
        &self,
        message: impl Into<String>,
        interval: Duration,
        timer: StatusTimer,
        subscriber: Option<ProgressSubscriber>,
    ) -> HeartbeatHandle {
        let message = message.into();
        let period = interval.max(MIN_INTERVAL);

        let mut registry = self.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let line = format_progress(&timer, &message);
                trace!(heartbeat = id, %line, "heartbeat");
                notify(subscriber.as_ref(), line);
            }
        });

        registry.live.insert(id, task);
        debug!(heartbeat = id, ?period, "heartbeat started");

        HeartbeatHandle(id)
    }

    /// Cancel one heartbeat. Unknown or already finished handles are ignored.
    pub fn finish(&self, handle: HeartbeatHandle) {
        if let Some(task) = self.lock().live.remove(&handle.0) {
            task.abort();
            debug!(heartbeat = handle.0, "heartbeat finished");
        }
    }

    /// Cancel every heartbeat registered with this notifier.
    ///
    /// Returns how many were still live.
    pub fn kill_all(&self) -> usize {
        let drained: Vec<_> = self.lock().live.drain().collect();
        let count = drained.len();
        for (_, task) in drained {
            task.abort();
        }
        if count > 0 {
            debug!(count, "killed outstanding heartbeats");
        }
        count
    }

    /// Number of heartbeats currently registered.
    pub fn live_count(&self) -> usize {
        self.lock().live.len()
    }

    /// Guard that calls `kill_all` when dropped.
    pub fn scope(&self) -> NotifierScope {
        NotifierScope {
            notifier: self.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Kills all heartbeats of a notifier when dropped.
#[derive(Debug)]
pub struct NotifierScope {
    notifier: ProgressNotifier,
}

impl Drop for NotifierScope {
    fn drop(&mut self) {
        self.notifier.kill_all();
    }
}

/// Finishes a single heartbeat when dropped.
#[derive(Debug)]
pub struct HeartbeatGuard {
    notifier: ProgressNotifier,
    handle: HeartbeatHandle,
}

impl HeartbeatGuard {
    pub fn new(notifier: ProgressNotifier, handle: HeartbeatHandle) -> Self {
        Self { notifier, handle }
    }
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.notifier.finish(self.handle);
    }
}
