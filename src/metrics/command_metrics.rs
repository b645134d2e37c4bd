//! Per command group metrics facade.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::clock::Clock;
use crate::metrics::{HealthCountsSnapshot, MetricsCounter, Outcome};
use crate::observability::metrics as telemetry;

/// Tracks outcomes for one command group and serves the health snapshot the
/// circuit breaker judges.
///
/// The snapshot is cached and only recomputed once it is at least
/// `snapshot_interval_ms` old, so a burst of admission checks costs one
/// window sum per interval. Concurrent recomputations race harmlessly; the
/// last store wins.
#[derive(Debug)]
pub struct CommandMetrics {
    counter: MetricsCounter,
    clock: Arc<dyn Clock>,
    snapshot_interval_ms: u64,
    last_snapshot: ArcSwapOption<HealthCountsSnapshot>,
}

impl CommandMetrics {
    pub fn new(counter: MetricsCounter, clock: Arc<dyn Clock>, snapshot_interval_ms: u64) -> Self {
        Self {
            counter,
            clock,
            snapshot_interval_ms,
            last_snapshot: ArcSwapOption::const_empty(),
        }
    }

    pub fn command_key(&self) -> &str {
        self.counter.command_key()
    }

    pub fn mark_success(&self) {
        self.mark(Outcome::Success);
    }

    pub fn mark_failure(&self) {
        self.mark(Outcome::Failure);
    }

    pub fn mark_timeout(&self) {
        self.mark(Outcome::Timeout);
    }

    pub fn mark_short_circuited(&self) {
        self.mark(Outcome::ShortCircuited);
    }

    pub fn mark_fallback_success(&self) {
        self.mark(Outcome::FallbackSuccess);
    }

    pub fn mark_fallback_failure(&self) {
        self.mark(Outcome::FallbackFailure);
    }

    pub fn mark_exception_thrown(&self) {
        self.mark(Outcome::ExceptionThrown);
    }

    pub fn mark_response_from_cache(&self) {
        self.mark(Outcome::ResponseFromCache);
    }

    /// Record one outcome in the rolling window.
    pub fn mark(&self, outcome: Outcome) {
        self.counter.add(outcome);
        telemetry::record_event(self.command_key(), outcome);
    }

    /// Rolling sum for `outcome` over the statistical window.
    pub fn rolling_count(&self, outcome: Outcome) -> u64 {
        self.counter.sum(outcome)
    }

    /// Zero the whole window and drop the cached health snapshot. Called when
    /// an open circuit closes; statistics recorded concurrently by in-flight
    /// requests are discarded with it.
    pub fn reset_counter(&self) {
        self.counter.reset();
        self.last_snapshot.store(None);
    }

    /// The cached health snapshot, recomputed when stale.
    pub fn health_counts(&self) -> HealthCountsSnapshot {
        let now = self.clock.now_millis();
        if let Some(snapshot) = self.last_snapshot.load().as_deref() {
            if now.saturating_sub(snapshot.time()) < self.snapshot_interval_ms {
                return *snapshot;
            }
        }

        let snapshot = HealthCountsSnapshot::new(
            now,
            self.counter.sum(Outcome::Success),
            self.counter.sum(Outcome::Failure),
        );
        self.last_snapshot.store(Some(Arc::new(snapshot)));
        snapshot
    }
}
