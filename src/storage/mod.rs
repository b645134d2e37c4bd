//! Counter and circuit-state storage.
//!
//! # Data Flow
//! ```text
//! MetricsCounter
//!     → increment_bucket / get_bucket / reset_bucket
//!       addressed by (command key, outcome, bucket index)
//!
//! CircuitBreaker
//!     → open_circuit / close_circuit / is_circuit_open
//!     → allow_single_test (half-open gate)
//!       addressed by (command key, flag)
//! ```
//!
//! # Design Decisions
//! - Storage is the only shared mutable state; callers never read-modify-write
//! - `increment_bucket`, `reset_bucket` and `allow_single_test` must be atomic
//!   at the storage layer
//! - Missing buckets read as `None` and are treated as zero by callers
//! - Bucket and flag entries expire through TTLs instead of explicit deletes

pub mod array;
pub mod memory;

use std::fmt::Debug;

use crate::metrics::Outcome;

pub use array::ArrayStateStorage;
pub use memory::InMemoryStateStorage;

/// Storage contract consumed by the metrics counter and the circuit breaker.
pub trait StateStorage: Send + Sync + Debug {
    /// Atomically create the bucket at 1 (with the bucket TTL) or add 1.
    fn increment_bucket(&self, command_key: &str, outcome: Outcome, index: i64);

    /// Current bucket value, `None` when absent or expired.
    fn get_bucket(&self, command_key: &str, outcome: Outcome, index: i64) -> Option<u64>;

    /// Set an existing bucket to 0. Absent buckets are left absent.
    fn reset_bucket(&self, command_key: &str, outcome: Outcome, index: i64);

    /// Flag the circuit open and block single tests for the sleep window,
    /// unless a block is already in place.
    fn open_circuit(&self, command_key: &str, sleep_window_ms: u64);

    /// Clear the open flag.
    fn close_circuit(&self, command_key: &str);

    fn is_circuit_open(&self, command_key: &str) -> bool;

    /// Atomic create-if-absent of the single-test block. Returns true only for
    /// the caller that created it; that caller may run the trial request.
    fn allow_single_test(&self, command_key: &str, sleep_window_ms: u64) -> bool;
}

/// Flag TTL: the sleep window rounded up to whole seconds.
pub(crate) fn flag_ttl_millis(sleep_window_ms: u64) -> u64 {
    sleep_window_ms.div_ceil(1_000).saturating_mul(1_000)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_ttl_rounds_up_to_seconds() {
        assert_eq!(flag_ttl_millis(0), 0);
        assert_eq!(flag_ttl_millis(1), 1_000);
        assert_eq!(flag_ttl_millis(1_000), 1_000);
        assert_eq!(flag_ttl_millis(1_001), 2_000);
        assert_eq!(flag_ttl_millis(u64::MAX), u64::MAX);
    }
}
