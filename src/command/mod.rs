//! Command execution.
//!
//! # Data Flow
//! ```text
//! Caller
//!     → factory.rs get_command(cmd) (resolve config for cmd.command_key())
//!     → executor.rs CommandHandle::execute
//!         → metrics / circuit registries (one instance per key)
//!         → request cache + request log (optional, per request)
//!     → value, or ExecuteError (error.rs)
//! ```
//!
//! # Design Decisions
//! - Commands are the caller's own types behind `Command`; the engine owns the
//!   control flow, never the work
//! - Bad requests bypass metrics and fallback entirely
//! - Registries are explicit objects, no process-global state

pub mod error;
pub mod executor;
pub mod factory;

pub use error::{
    BoxError, CommandRuntimeError, ExecuteError, FailureKind, FallbackError, RunError, SharedError,
};
pub use executor::{Command, CommandHandle};
pub use factory::CommandFactory;
