//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (percentages, window sizes, bucket counts)
//! - Detect contradictory switches (force open and force closed)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure: config → Result<(), Vec<ValidationError>>
//! - Every command override is validated as its resolved config

use thiserror::Error;

use crate::config::schema::{BreakwaterConfig, CommandConfig};

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{scope}: errorThresholdPercentage must be within 0..=100, got {value}")]
    ErrorThresholdOutOfRange { scope: String, value: u32 },

    #[error("{scope}: rollingStatisticalWindowInMilliseconds must be greater than 0")]
    EmptyWindow { scope: String },

    #[error("{scope}: rollingStatisticalWindowBuckets must be greater than 0")]
    NoBuckets { scope: String },

    #[error("{scope}: window of {window_ms}ms cannot be split into {buckets} buckets of at least 1ms")]
    BucketTooNarrow {
        scope: String,
        window_ms: u64,
        buckets: u32,
    },

    #[error("{scope}: forceOpen and forceClosed cannot both be set")]
    ConflictingForce { scope: String },

    #[error("storage: bucketTtlSecs must be greater than 0")]
    ZeroBucketTtl,

    #[error("{scope}: bucketTtlSecs of {ttl_secs}s expires buckets inside the {window_ms}ms window")]
    BucketTtlShorterThanWindow {
        scope: String,
        ttl_secs: u64,
        window_ms: u64,
    },
}

/// Validate a single resolved command configuration.
pub fn validate_command_config(scope: &str, config: &CommandConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let cb = &config.circuit_breaker;
    let metrics = &config.metrics;

    if cb.error_threshold_percentage > 100 {
        errors.push(ValidationError::ErrorThresholdOutOfRange {
            scope: scope.to_string(),
            value: cb.error_threshold_percentage,
        });
    }
    if cb.force_open && cb.force_closed {
        errors.push(ValidationError::ConflictingForce {
            scope: scope.to_string(),
        });
    }

    let window = metrics.rolling_statistical_window_in_milliseconds;
    let buckets = metrics.rolling_statistical_window_buckets;
    if window == 0 {
        errors.push(ValidationError::EmptyWindow {
            scope: scope.to_string(),
        });
    }
    if buckets == 0 {
        errors.push(ValidationError::NoBuckets {
            scope: scope.to_string(),
        });
    }
    if window > 0 && buckets > 0 && window < u64::from(buckets) {
        errors.push(ValidationError::BucketTooNarrow {
            scope: scope.to_string(),
            window_ms: window,
            buckets,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the root configuration and every named override.
pub fn validate_config(config: &BreakwaterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(mut e) = validate_command_config("default", &config.default) {
        errors.append(&mut e);
    }
    check_bucket_ttl("default", &config.default, config.storage.bucket_ttl_secs, &mut errors);

    let mut keys: Vec<&String> = config.commands.keys().collect();
    keys.sort();
    for key in keys {
        let resolved = config.resolve(key);
        if let Err(mut e) = validate_command_config(key, &resolved) {
            errors.append(&mut e);
        }
        check_bucket_ttl(key, &resolved, config.storage.bucket_ttl_secs, &mut errors);
    }

    if config.storage.bucket_ttl_secs == 0 {
        errors.push(ValidationError::ZeroBucketTtl);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Buckets must outlive the window they are summed over.
fn check_bucket_ttl(scope: &str, config: &CommandConfig, ttl_secs: u64, errors: &mut Vec<ValidationError>) {
    let window_ms = config.metrics.rolling_statistical_window_in_milliseconds;
    if ttl_secs > 0 && ttl_secs.saturating_mul(1_000) < window_ms {
        errors.push(ValidationError::BucketTtlShorterThanWindow {
            scope: scope.to_string(),
            ttl_secs,
            window_ms,
        });
    }
}
