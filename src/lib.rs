//! Breakwater: fault-tolerance middleware for risky calls.
//!
//! Wraps units of remote work ("commands") with a circuit breaker, rolling
//! health metrics, a per-request result cache and a fallback path, so a
//! failing dependency degrades callers instead of exhausting them.
//!
//! # Architecture Overview
//!
//! ```text
//!     Caller ──▶ CommandFactory ──▶ CommandHandle::execute
//!                                        │
//!              ┌─────────────────────────┼──────────────────────────┐
//!              ▼                         ▼                          ▼
//!        request cache /           circuit breaker            command metrics
//!        request log               (per command key)          (per command key)
//!                                        │                          │
//!                                        └────────┬─────────────────┘
//!                                                 ▼
//!                                           StateStorage
//!                                  (buckets, open / half-open flags)
//! ```

// Core subsystems
pub mod circuit;
pub mod command;
pub mod metrics;
pub mod storage;

// Request scope
pub mod request;

// Cross-cutting concerns
pub mod clock;
pub mod config;
pub mod observability;

pub use command::{Command, CommandFactory, CommandHandle, ExecuteError, FallbackError, RunError};
pub use config::BreakwaterConfig;
pub use request::RequestContext;
