//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BreakwaterConfig (validated, immutable)
//!
//! Per command group:
//!     default section
//!     → named override ([commands.<key>])
//!     → runtime override (CommandHandle::set_config)
//!     → CommandConfig consumed by the engine, breaker and metrics
//! ```
//!
//! # Design Decisions
//! - Config is strongly typed; no string-keyed lookups at execution time
//! - All fields have defaults to allow minimal configs
//! - Overrides are `Option` patches so "unset" and "false" stay distinct

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    BreakwaterConfig, CircuitBreakerConfig, CircuitBreakerPatch, CommandConfig, CommandConfigPatch,
    FallbackConfig, MetricsConfig, MetricsPatch, ObservabilityConfig, RequestCacheConfig,
    RequestLogConfig, StorageConfig, TogglePatch,
};
pub use validation::{validate_command_config, validate_config, ValidationError};
