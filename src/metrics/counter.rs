//! Time-bucketed rolling counter.
//!
//! # Bucket indices
//! ```text
//! width = window_ms / buckets
//! index(offset, now) = floor((now - offset * width) / width)
//! ```
//! Indices are absolute (derived from epoch time), so every process sharing
//! a storage backend agrees on which bucket is current. A width that does
//! not divide the window evenly only shifts boundaries by a fraction of a
//! millisecond.

use std::sync::Arc;

use crate::clock::Clock;
use crate::metrics::Outcome;
use crate::storage::StateStorage;

/// Counts outcomes for one command group within the rolling window.
#[derive(Debug)]
pub struct MetricsCounter {
    command_key: String,
    storage: Arc<dyn StateStorage>,
    clock: Arc<dyn Clock>,
    buckets: u32,
    bucket_width_ms: f64,
}

impl MetricsCounter {
    pub fn new(
        command_key: impl Into<String>,
        storage: Arc<dyn StateStorage>,
        clock: Arc<dyn Clock>,
        window_ms: u64,
        buckets: u32,
    ) -> Self {
        let buckets = buckets.max(1);
        Self {
            command_key: command_key.into(),
            storage,
            clock,
            buckets,
            bucket_width_ms: (window_ms.max(1) as f64) / f64::from(buckets),
        }
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    /// Increment the current bucket for `outcome`.
    pub fn add(&self, outcome: Outcome) {
        let index = self.bucket_index(0, self.clock.now_millis());
        self.storage.increment_bucket(&self.command_key, outcome, index);
    }

    /// Sum of `outcome` over every bucket of the window.
    pub fn sum(&self, outcome: Outcome) -> u64 {
        let now = self.clock.now_millis();
        (0..self.buckets)
            .map(|offset| {
                self.storage
                    .get_bucket(&self.command_key, outcome, self.bucket_index(offset, now))
                    .unwrap_or(0)
            })
            .sum()
    }

    /// Zero every existing bucket of the window, for every outcome.
    pub fn reset(&self) {
        let now = self.clock.now_millis();
        for outcome in Outcome::ALL {
            for offset in 0..self.buckets {
                self.storage
                    .reset_bucket(&self.command_key, outcome, self.bucket_index(offset, now));
            }
        }
    }

    fn bucket_index(&self, offset: u32, now: u64) -> i64 {
        let width = self.bucket_width_ms;
        ((now as f64 - f64::from(offset) * width) / width).floor() as i64
    }
}
