// src/engine/report.rs

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::progress::StatusTimer;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub sequence: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(rename = "elapsedSeconds", serialize_with = "ser_seconds")]
    pub elapsed: Duration,
    pub groups: usize,
    pub steps: usize,
}

impl StatusReport {
    /// Build a report from a stopped timer.
    pub(crate) fn from_timer(sequence: &str, timer: &StatusTimer, groups: usize, steps: usize) -> Self {
        let end_time = timer.ended_at().unwrap_or_else(Utc::now);
        Self {
            sequence: sequence.to_string(),
            start_time: timer.started_at().unwrap_or(end_time),
            end_time,
            elapsed: timer.elapsed(),
            groups,
            steps,
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Elapsed seconds with three decimal places.
    pub fn elapsed_display(&self) -> String {
        format!("{:.3}", self.elapsed_seconds())
    }
}

fn ser_seconds<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}
