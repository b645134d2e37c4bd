//! Registry of one circuit breaker per command key.

use std::sync::Arc;

use dashmap::DashMap;

use crate::circuit::{CircuitBreaker, NoOpCircuitBreaker, StorageCircuitBreaker};
use crate::config::CircuitBreakerConfig;
use crate::metrics::CommandMetrics;
use crate::storage::StateStorage;

/// Lazily builds and memoizes circuit breakers.
///
/// Whether a key gets a real or a no-op breaker is decided from the config
/// seen on first access and never revisited for that key.
#[derive(Debug)]
pub struct CircuitBreakerFactory {
    storage: Arc<dyn StateStorage>,
    by_key: DashMap<String, Arc<dyn CircuitBreaker>>,
}

impl CircuitBreakerFactory {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self {
            storage,
            by_key: DashMap::new(),
        }
    }

    pub fn get(
        &self,
        command_key: &str,
        config: &CircuitBreakerConfig,
        metrics: Arc<CommandMetrics>,
    ) -> Arc<dyn CircuitBreaker> {
        if let Some(existing) = self.by_key.get(command_key) {
            return existing.clone();
        }

        self.by_key
            .entry(command_key.to_string())
            .or_insert_with(|| -> Arc<dyn CircuitBreaker> {
                if config.enabled {
                    tracing::debug!(command = command_key, "Creating circuit breaker");
                    Arc::new(StorageCircuitBreaker::new(
                        command_key,
                        metrics,
                        config.clone(),
                        self.storage.clone(),
                    ))
                } else {
                    tracing::debug!(command = command_key, "Circuit breaking disabled, using no-op breaker");
                    Arc::new(NoOpCircuitBreaker)
                }
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
