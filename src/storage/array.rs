//! Plain map storage without expiry. For tests only.
//!
//! There is no cross-process atomicity and buckets never expire, so it must
//! not back production circuit breaking. The open circuit is tracked as the
//! instant from which the next single test is allowed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::metrics::Outcome;
use crate::storage::StateStorage;

#[derive(Debug, Default)]
struct Inner {
    buckets: HashMap<(String, Outcome, i64), u64>,
    /// command key -> time in milliseconds after which a single test is allowed
    open_circuits: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct ArrayStateStorage {
    inner: Mutex<Inner>,
    clock: Arc<dyn Clock>,
}

impl Default for ArrayStateStorage {
    fn default() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }
}

impl ArrayStateStorage {
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            clock,
        }
    }
}

impl StateStorage for ArrayStateStorage {
    fn increment_bucket(&self, command_key: &str, outcome: Outcome, index: i64) {
        let mut inner = self.inner.lock();
        *inner
            .buckets
            .entry((command_key.to_string(), outcome, index))
            .or_insert(0) += 1;
    }

    fn get_bucket(&self, command_key: &str, outcome: Outcome, index: i64) -> Option<u64> {
        self.inner
            .lock()
            .buckets
            .get(&(command_key.to_string(), outcome, index))
            .copied()
    }

    fn reset_bucket(&self, command_key: &str, outcome: Outcome, index: i64) {
        let mut inner = self.inner.lock();
        if let Some(value) = inner.buckets.get_mut(&(command_key.to_string(), outcome, index)) {
            *value = 0;
        }
    }

    fn open_circuit(&self, command_key: &str, sleep_window_ms: u64) {
        let allowed_at = self.clock.now_millis().saturating_add(sleep_window_ms);
        self.inner
            .lock()
            .open_circuits
            .insert(command_key.to_string(), allowed_at);
    }

    fn close_circuit(&self, command_key: &str) {
        self.inner.lock().open_circuits.remove(command_key);
    }

    fn is_circuit_open(&self, command_key: &str) -> bool {
        self.inner.lock().open_circuits.contains_key(command_key)
    }

    fn allow_single_test(&self, command_key: &str, sleep_window_ms: u64) -> bool {
        let now = self.clock.now_millis();
        let mut inner = self.inner.lock();
        match inner.open_circuits.get_mut(command_key) {
            None => true,
            Some(allowed_at) => {
                let allow = *allowed_at < now;
                *allowed_at = now.saturating_add(sleep_window_ms);
                allow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::contract;

    #[test]
    fn test_contract() {
        let clock = ManualClock::new(1_000_000);
        contract::buckets_count_and_reset(&ArrayStateStorage::with_clock(Arc::new(clock.clone())));
        contract::circuit_flags(&ArrayStateStorage::with_clock(Arc::new(clock.clone())));
        contract::single_test_blocked_after_open(&ArrayStateStorage::with_clock(Arc::new(clock)));
    }

    #[test]
    fn test_single_test_rearms_window() {
        let clock = ManualClock::new(1_000_000);
        let storage = ArrayStateStorage::with_clock(Arc::new(clock.clone()));

        assert!(storage.allow_single_test("cmd", 1_000));

        storage.open_circuit("cmd", 1_000);
        clock.advance(1_001);
        assert!(storage.allow_single_test("cmd", 1_000));
        assert!(!storage.allow_single_test("cmd", 1_000));

        clock.advance(1_001);
        assert!(storage.allow_single_test("cmd", 1_000));
    }

    #[test]
    fn test_huge_sleep_window_saturates() {
        let clock = ManualClock::new(1_000_000);
        let storage = ArrayStateStorage::with_clock(Arc::new(clock.clone()));

        storage.open_circuit("cmd", u64::MAX);
        clock.advance(1_000_000_000);
        assert!(!storage.allow_single_test("cmd", u64::MAX));
        assert!(storage.is_circuit_open("cmd"));
    }
}
