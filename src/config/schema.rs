//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for commands.
//! All types derive Serde traits for deserialization from config files.
//! Keys are camelCase so files read the same as the option names
//! (`circuitBreaker.sleepWindowInMilliseconds`, ...).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakwaterConfig {
    /// Settings applied to every command group.
    pub default: CommandConfig,

    /// Per command key overrides, merged on top of `default`.
    pub commands: HashMap<String, CommandConfigPatch>,

    /// State storage settings.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl BreakwaterConfig {
    /// Resolve the effective configuration for a command key: defaults,
    /// then the named override if one exists.
    pub fn resolve(&self, command_key: &str) -> CommandConfig {
        let mut config = self.default.clone();
        if let Some(patch) = self.commands.get(command_key) {
            config.merge(patch);
        }
        config
    }
}

/// Effective configuration for one command group.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfig {
    pub circuit_breaker: CircuitBreakerConfig,
    pub metrics: MetricsConfig,
    pub fallback: FallbackConfig,
    pub request_cache: RequestCacheConfig,
    pub request_log: RequestLogConfig,
}

impl CommandConfig {
    /// Apply every field set in `patch`.
    pub fn merge(&mut self, patch: &CommandConfigPatch) {
        let cb = &patch.circuit_breaker;
        set(&mut self.circuit_breaker.enabled, cb.enabled);
        set(&mut self.circuit_breaker.force_open, cb.force_open);
        set(&mut self.circuit_breaker.force_closed, cb.force_closed);
        set(
            &mut self.circuit_breaker.error_threshold_percentage,
            cb.error_threshold_percentage,
        );
        set(
            &mut self.circuit_breaker.request_volume_threshold,
            cb.request_volume_threshold,
        );
        set(
            &mut self.circuit_breaker.sleep_window_in_milliseconds,
            cb.sleep_window_in_milliseconds,
        );

        let m = &patch.metrics;
        set(
            &mut self.metrics.rolling_statistical_window_in_milliseconds,
            m.rolling_statistical_window_in_milliseconds,
        );
        set(
            &mut self.metrics.rolling_statistical_window_buckets,
            m.rolling_statistical_window_buckets,
        );
        set(
            &mut self.metrics.health_snapshot_interval_in_milliseconds,
            m.health_snapshot_interval_in_milliseconds,
        );

        set(&mut self.fallback.enabled, patch.fallback.enabled);
        set(&mut self.request_cache.enabled, patch.request_cache.enabled);
        set(&mut self.request_log.enabled, patch.request_log.enabled);
    }

    /// Return a copy with `patch` applied.
    pub fn merged(&self, patch: &CommandConfigPatch) -> Self {
        let mut config = self.clone();
        config.merge(patch);
        config
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitBreakerConfig {
    /// When false the group gets a breaker that never trips.
    pub enabled: bool,

    /// Deny every request.
    pub force_open: bool,

    /// Allow every request, ignoring health statistics.
    pub force_closed: bool,

    /// Error percentage at or above which the circuit opens.
    pub error_threshold_percentage: u32,

    /// Minimum requests in the rolling window before the error rate is judged.
    pub request_volume_threshold: u64,

    /// Time after opening before a single trial request is let through.
    pub sleep_window_in_milliseconds: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            force_open: false,
            force_closed: false,
            error_threshold_percentage: 50,
            request_volume_threshold: 10,
            sleep_window_in_milliseconds: 5_000,
        }
    }
}

/// Rolling metrics settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsConfig {
    /// Length of the rolling statistical window.
    pub rolling_statistical_window_in_milliseconds: u64,

    /// Number of buckets the window is divided into.
    pub rolling_statistical_window_buckets: u32,

    /// Minimum age of the cached health snapshot before it is recomputed.
    pub health_snapshot_interval_in_milliseconds: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rolling_statistical_window_in_milliseconds: 1_000,
            rolling_statistical_window_buckets: 10,
            health_snapshot_interval_in_milliseconds: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestCacheConfig {
    pub enabled: bool,
}

impl Default for RequestCacheConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RequestLogConfig {
    pub enabled: bool,
}

/// Partial command configuration. Unset fields leave the base untouched.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CommandConfigPatch {
    pub circuit_breaker: CircuitBreakerPatch,
    pub metrics: MetricsPatch,
    pub fallback: TogglePatch,
    pub request_cache: TogglePatch,
    pub request_log: TogglePatch,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct CircuitBreakerPatch {
    pub enabled: Option<bool>,
    pub force_open: Option<bool>,
    pub force_closed: Option<bool>,
    pub error_threshold_percentage: Option<u32>,
    pub request_volume_threshold: Option<u64>,
    pub sleep_window_in_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct MetricsPatch {
    pub rolling_statistical_window_in_milliseconds: Option<u64>,
    pub rolling_statistical_window_buckets: Option<u32>,
    pub health_snapshot_interval_in_milliseconds: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TogglePatch {
    pub enabled: Option<bool>,
}

/// State storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Expiry applied to metric buckets, in seconds.
    pub bucket_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_ttl_secs: 120,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Mirror outcomes into the metrics facade.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
        }
    }
}
