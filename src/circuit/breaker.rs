//! Circuit breaker for command groups.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: dependency assumed down, requests are short-circuited
//! - Half-Open: one trial request per sleep window is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: volume >= request_volume_threshold
//!                and error % >= error_threshold_percentage
//! Open → Half-Open: single-test block expires (sleep window)
//! Half-Open → Closed: trial request succeeds (metrics are reset)
//! Half-Open → Open: trial request fails (block re-armed by the next check)
//! ```
//!
//! # Design Decisions
//! - State lives in `StateStorage`, never in the breaker itself
//! - Only `is_open` opens a circuit; only `mark_success` closes one
//! - The half-open gate is the storage's atomic create-if-absent

use std::fmt::Debug;
use std::sync::Arc;

use crate::config::CircuitBreakerConfig;
use crate::metrics::CommandMetrics;
use crate::observability::metrics as telemetry;
use crate::storage::StateStorage;

/// Admission control consulted by the execution engine.
pub trait CircuitBreaker: Send + Sync + Debug {
    /// Whether the next request may run.
    fn allow_request(&self) -> bool;

    /// Whether the circuit is currently open. May open it.
    fn is_open(&self) -> bool;

    /// Whether this caller won the half-open trial.
    fn allow_single_test(&self) -> bool;

    /// Report a successful execution.
    fn mark_success(&self);
}

/// Breaker backed by rolling metrics and shared storage flags.
#[derive(Debug)]
pub struct StorageCircuitBreaker {
    command_key: String,
    metrics: Arc<CommandMetrics>,
    config: CircuitBreakerConfig,
    storage: Arc<dyn StateStorage>,
}

impl StorageCircuitBreaker {
    pub fn new(
        command_key: impl Into<String>,
        metrics: Arc<CommandMetrics>,
        config: CircuitBreakerConfig,
        storage: Arc<dyn StateStorage>,
    ) -> Self {
        Self {
            command_key: command_key.into(),
            metrics,
            config,
            storage,
        }
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }
}

impl CircuitBreaker for StorageCircuitBreaker {
    fn allow_request(&self) -> bool {
        if self.config.force_open {
            return false;
        }
        if self.config.force_closed {
            return true;
        }
        !self.is_open() || self.allow_single_test()
    }

    fn is_open(&self) -> bool {
        if self.storage.is_circuit_open(&self.command_key) {
            // closing is left to a successful single test
            return true;
        }

        let health = self.metrics.health_counts();
        if health.total() < self.config.request_volume_threshold {
            return false;
        }

        let error_percentage = health.error_percentage();
        if error_percentage < f64::from(self.config.error_threshold_percentage) {
            return false;
        }

        self.storage
            .open_circuit(&self.command_key, self.config.sleep_window_in_milliseconds);
        tracing::warn!(
            command = %self.command_key,
            total = health.total(),
            error_percentage,
            sleep_window_ms = self.config.sleep_window_in_milliseconds,
            "Circuit opened"
        );
        telemetry::record_circuit_transition(&self.command_key, "open");
        true
    }

    fn allow_single_test(&self) -> bool {
        let allowed = self
            .storage
            .allow_single_test(&self.command_key, self.config.sleep_window_in_milliseconds);
        if allowed {
            tracing::debug!(command = %self.command_key, "Single test allowed through open circuit");
        }
        allowed
    }

    fn mark_success(&self) {
        if self.storage.is_circuit_open(&self.command_key) {
            self.storage.close_circuit(&self.command_key);
            // may drop statistics recorded concurrently by in-flight requests
            self.metrics.reset_counter();
            tracing::info!(command = %self.command_key, "Circuit closed");
            telemetry::record_circuit_transition(&self.command_key, "closed");
        }
    }
}

/// Breaker used when circuit breaking is disabled for a group.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpCircuitBreaker;

impl CircuitBreaker for NoOpCircuitBreaker {
    fn allow_request(&self) -> bool {
        true
    }

    fn is_open(&self) -> bool {
        false
    }

    fn allow_single_test(&self) -> bool {
        true
    }

    fn mark_success(&self) {}
}
