//! Registry of one `CommandMetrics` per command key.

use std::sync::Arc;

use dashmap::DashMap;

use crate::clock::{Clock, SystemClock};
use crate::config::MetricsConfig;
use crate::metrics::{CommandMetrics, MetricsCounter};
use crate::storage::StateStorage;

/// Lazily builds and memoizes metrics per command key.
///
/// Insertion goes through the map entry, so concurrent first access for a
/// key constructs exactly one instance and every caller observes it. The
/// config passed on first access wins for the lifetime of the registry.
#[derive(Debug)]
pub struct CommandMetricsFactory {
    storage: Arc<dyn StateStorage>,
    clock: Arc<dyn Clock>,
    by_key: DashMap<String, Arc<CommandMetrics>>,
}

impl CommandMetricsFactory {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    pub fn with_clock(storage: Arc<dyn StateStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            by_key: DashMap::new(),
        }
    }

    pub fn get(&self, command_key: &str, config: &MetricsConfig) -> Arc<CommandMetrics> {
        if let Some(existing) = self.by_key.get(command_key) {
            return existing.clone();
        }

        self.by_key
            .entry(command_key.to_string())
            .or_insert_with(|| {
                tracing::debug!(
                    command = command_key,
                    window_ms = config.rolling_statistical_window_in_milliseconds,
                    buckets = config.rolling_statistical_window_buckets,
                    "Creating command metrics"
                );
                let counter = MetricsCounter::new(
                    command_key,
                    self.storage.clone(),
                    self.clock.clone(),
                    config.rolling_statistical_window_in_milliseconds,
                    config.rolling_statistical_window_buckets,
                );
                Arc::new(CommandMetrics::new(
                    counter,
                    self.clock.clone(),
                    config.health_snapshot_interval_in_milliseconds,
                ))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
