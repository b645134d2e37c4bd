//! In-process state storage with expiring entries.
//!
//! Every mutation goes through a `DashMap` entry, which holds the shard lock
//! for the whole check-and-write, so increments and the single-test gate are
//! atomic for all threads of the process.
//!
//! Bucket indices only move forward, so a stale bucket is never written
//! again. Expired entries are swept from the write path at most once per
//! bucket TTL, which caps the map at roughly two TTLs worth of buckets.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};
use crate::config::StorageConfig;
use crate::metrics::Outcome;
use crate::storage::{flag_ttl_millis, StateStorage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Flag {
    Opened,
    SingleTestBlocked,
}

#[derive(Debug, Clone, Copy)]
struct Slot<T> {
    value: T,
    /// Absolute expiry in milliseconds; `None` never expires.
    expires_at: Option<u64>,
}

impl<T> Slot<T> {
    fn new(value: T, expires_at: Option<u64>) -> Self {
        Self { value, expires_at }
    }

    fn is_live(&self, now: u64) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

type BucketKey = (String, Outcome, i64);

/// DashMap-backed storage shared by every command group of the process.
#[derive(Debug)]
pub struct InMemoryStateStorage {
    buckets: DashMap<BucketKey, Slot<u64>>,
    flags: DashMap<(String, Flag), Slot<bool>>,
    bucket_ttl_ms: u64,
    /// Instant in milliseconds after which the next write sweeps expired entries.
    next_purge_at: AtomicU64,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryStateStorage {
    fn default() -> Self {
        Self::new(&StorageConfig::default())
    }
}

impl InMemoryStateStorage {
    pub fn new(config: &StorageConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &StorageConfig, clock: Arc<dyn Clock>) -> Self {
        let bucket_ttl_ms = config.bucket_ttl_secs.saturating_mul(1_000);
        Self {
            buckets: DashMap::new(),
            flags: DashMap::new(),
            bucket_ttl_ms,
            next_purge_at: AtomicU64::new(clock.now_millis().saturating_add(bucket_ttl_ms)),
            clock,
        }
    }

    /// Drop every expired entry. Reads already ignore them; this only
    /// reclaims memory.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now_millis();
        let before = self.buckets.len() + self.flags.len();
        self.buckets.retain(|_, slot| slot.is_live(now));
        self.flags.retain(|_, slot| slot.is_live(now));
        let purged = before - (self.buckets.len() + self.flags.len());
        if purged > 0 {
            tracing::trace!(purged, "Purged expired storage entries");
        }
        purged
    }

    /// Sweep if the purge interval has passed. Only the caller that wins the
    /// swap sweeps; must not be called while holding a map entry.
    fn maybe_purge(&self, now: u64) {
        let due = self.next_purge_at.load(Ordering::Relaxed);
        if now < due {
            return;
        }
        let next = now.saturating_add(self.bucket_ttl_ms.max(1));
        if self
            .next_purge_at
            .compare_exchange(due, next, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.purge_expired();
        }
    }

    /// Number of stored entries, live or not.
    pub fn len(&self) -> usize {
        self.buckets.len() + self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bucket_key(command_key: &str, outcome: Outcome, index: i64) -> BucketKey {
        (command_key.to_string(), outcome, index)
    }

    fn flag(&self, command_key: &str, flag: Flag) -> Option<bool> {
        let now = self.clock.now_millis();
        self.flags
            .get(&(command_key.to_string(), flag))
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value)
    }

    /// Create the flag unless a live one exists. Returns whether it was created.
    fn add_flag(&self, command_key: &str, flag: Flag, ttl_ms: u64) -> bool {
        let now = self.clock.now_millis();
        let fresh = Slot::new(true, Some(now.saturating_add(ttl_ms)));
        match self.flags.entry((command_key.to_string(), flag)) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    false
                } else {
                    occupied.insert(fresh);
                    true
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(fresh);
                true
            }
        }
    }
}

impl StateStorage for InMemoryStateStorage {
    fn increment_bucket(&self, command_key: &str, outcome: Outcome, index: i64) {
        let now = self.clock.now_millis();
        let fresh = Slot::new(1, Some(now.saturating_add(self.bucket_ttl_ms)));
        self.buckets
            .entry(Self::bucket_key(command_key, outcome, index))
            .and_modify(|slot| {
                if slot.is_live(now) {
                    slot.value += 1;
                } else {
                    *slot = fresh;
                }
            })
            .or_insert(fresh);
        self.maybe_purge(now);
    }

    fn get_bucket(&self, command_key: &str, outcome: Outcome, index: i64) -> Option<u64> {
        let now = self.clock.now_millis();
        self.buckets
            .get(&Self::bucket_key(command_key, outcome, index))
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value)
    }

    fn reset_bucket(&self, command_key: &str, outcome: Outcome, index: i64) {
        let now = self.clock.now_millis();
        if let Some(mut slot) = self.buckets.get_mut(&Self::bucket_key(command_key, outcome, index)) {
            if slot.is_live(now) {
                *slot = Slot::new(0, Some(now.saturating_add(self.bucket_ttl_ms)));
            }
        }
    }

    fn open_circuit(&self, command_key: &str, sleep_window_ms: u64) {
        self.flags
            .insert((command_key.to_string(), Flag::Opened), Slot::new(true, None));
        self.add_flag(
            command_key,
            Flag::SingleTestBlocked,
            flag_ttl_millis(sleep_window_ms),
        );
    }

    fn close_circuit(&self, command_key: &str) {
        self.flags
            .insert((command_key.to_string(), Flag::Opened), Slot::new(false, None));
    }

    fn is_circuit_open(&self, command_key: &str) -> bool {
        self.flag(command_key, Flag::Opened).unwrap_or(false)
    }

    fn allow_single_test(&self, command_key: &str, sleep_window_ms: u64) -> bool {
        self.add_flag(
            command_key,
            Flag::SingleTestBlocked,
            flag_ttl_millis(sleep_window_ms),
        )
    }
}
