// src/progress/timer.rs

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Wall-clock timer with a monotonic elapsed measure.
///
/// `elapsed()` before `stop()` returns the time so far, which is what live
/// heartbeats display. Only the first `stop()` after a `start()` is recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusTimer {
    start: Option<Mark>,
    end: Option<Mark>,
}

#[derive(Debug, Clone, Copy)]
struct Mark {
    instant: Instant,
    wall: DateTime<Utc>,
}

impl Mark {
    fn now() -> Self {
        Self {
            instant: Instant::now(),
            wall: Utc::now(),
        }
    }
}

impl StatusTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A timer that is already running.
    pub fn started() -> Self {
        let mut timer = Self::new();
        timer.start();
        timer
    }

    /// Record the start instant, clearing any previous stop.
    pub fn start(&mut self) {
        self.start = Some(Mark::now());
        self.end = None;
    }

    /// Record the end instant. Calling `stop` again has no effect.
    ///
    /// Stopping a timer that was never started starts and stops it at the
    /// same instant.
    pub fn stop(&mut self) {
        if self.end.is_some() {
            return;
        }
        let now = Mark::now();
        if self.start.is_none() {
            self.start = Some(now);
        }
        self.end = Some(now);
    }

    pub fn is_running(&self) -> bool {
        self.start.is_some() && self.end.is_none()
    }

    pub fn is_stopped(&self) -> bool {
        self.end.is_some()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start.map(|m| m.wall)
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.end.map(|m| m.wall)
    }

    pub fn elapsed(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.instant.duration_since(start.instant),
            (Some(start), None) => start.instant.elapsed(),
            (None, _) => Duration::ZERO,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Elapsed seconds with three decimal places, e.g. `"12.345"`.
    pub fn elapsed_display(&self) -> String {
        format!("{:.3}", self.elapsed_seconds())
    }
}
