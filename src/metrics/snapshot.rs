//! Point-in-time health counts.

use serde::Serialize;

/// Immutable success/failure summary of the rolling window at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HealthCountsSnapshot {
    time: u64,
    successful: u64,
    failure: u64,
}

impl HealthCountsSnapshot {
    pub fn new(time: u64, successful: u64, failure: u64) -> Self {
        Self {
            time,
            successful,
            failure,
        }
    }

    /// Capture time in milliseconds since the epoch.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn successful(&self) -> u64 {
        self.successful
    }

    pub fn failure(&self) -> u64 {
        self.failure
    }

    pub fn total(&self) -> u64 {
        self.successful + self.failure
    }

    /// `failure / total * 100`, or 0 when nothing was recorded.
    pub fn error_percentage(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.failure as f64 / total as f64 * 100.0
    }
}
