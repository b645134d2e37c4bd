//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Circuit breakers, metrics, command engine produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms via the `metrics` facade)
//!
//! Consumers:
//!     → stdout (fmt layer, filtered by RUST_LOG or config)
//!     → Prometheus exposition (handle returned by install_recorder)
//! ```
//!
//! # Design Decisions
//! - The rolling window in storage drives circuit decisions; the facade
//!   mirror is for dashboards only and never read back
//! - Facade calls are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
