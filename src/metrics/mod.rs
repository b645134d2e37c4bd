//! Rolling health metrics.
//!
//! # Data Flow
//! ```text
//! Command execution outcome
//!     → command_metrics.rs (mark_* per outcome)
//!     → counter.rs (bucket index from wall clock)
//!     → StateStorage::increment_bucket (atomic)
//!
//! Circuit breaker health check:
//!     → command_metrics.rs (cached HealthCountsSnapshot)
//!     → counter.rs (sum SUCCESS / FAILURE over the window) when stale
//! ```
//!
//! # Design Decisions
//! - Counters live in storage, not in process memory, so several
//!   processes sharing one backend judge the same window
//! - Reads sum at most `buckets` entries; missing buckets count as zero
//! - Snapshots throttle read cost and never block writers

pub mod command_metrics;
pub mod counter;
pub mod factory;
pub mod snapshot;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use command_metrics::CommandMetrics;
pub use counter::MetricsCounter;
pub use factory::CommandMetricsFactory;
pub use snapshot::HealthCountsSnapshot;

/// Outcome of one step of a command execution. Each occurrence increments
/// exactly one bucketed counter and is recorded as an execution event.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success = 1,
    Failure = 2,
    Timeout = 3,
    ShortCircuited = 4,
    FallbackSuccess = 5,
    FallbackFailure = 6,
    ExceptionThrown = 8,
    ResponseFromCache = 9,
}

impl Outcome {
    pub const ALL: [Outcome; 8] = [
        Outcome::Success,
        Outcome::Failure,
        Outcome::Timeout,
        Outcome::ShortCircuited,
        Outcome::FallbackSuccess,
        Outcome::FallbackFailure,
        Outcome::ExceptionThrown,
        Outcome::ResponseFromCache,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Failure => "FAILURE",
            Outcome::Timeout => "TIMEOUT",
            Outcome::ShortCircuited => "SHORT_CIRCUITED",
            Outcome::FallbackSuccess => "FALLBACK_SUCCESS",
            Outcome::FallbackFailure => "FALLBACK_FAILURE",
            Outcome::ExceptionThrown => "EXCEPTION_THROWN",
            Outcome::ResponseFromCache => "RESPONSE_FROM_CACHE",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
