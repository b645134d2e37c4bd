//! Circuit breaking subsystem.
//!
//! # Data Flow
//! ```text
//! CommandHandle::execute
//!     → factory.rs (one breaker per command key)
//!     → breaker.rs allow_request()
//!         → storage open flag / health snapshot / single-test gate
//!
//! On success:
//!     → breaker.rs mark_success()
//!     → close flag + metrics reset when the circuit was open
//! ```
//!
//! # Design Decisions
//! - Per command group breaker (not global)
//! - Fail fast while open; the engine routes straight to the fallback
//! - Single trial in half-open (prevents hammering a recovering dependency)

pub mod breaker;
pub mod factory;

pub use breaker::{CircuitBreaker, NoOpCircuitBreaker, StorageCircuitBreaker};
pub use factory::CircuitBreakerFactory;
