//! Command execution engine.
//!
//! # Flow
//! ```text
//! execute()
//!     → prepare hook
//!     → request log append (when enabled)
//!     → request cache hit?            → RESPONSE_FROM_CACHE, return
//!     → circuit breaker denies?       → SHORT_CIRCUITED, fallback
//!     → run()
//!         Ok                          → SUCCESS, breaker.mark_success
//!         BadRequest                  → return as is, nothing counted
//!         Failure                     → FAILURE, fallback
//!     → fallback
//!         disabled / unavailable      → EXCEPTION_THROWN, error
//!         Err                         → FALLBACK_FAILURE, EXCEPTION_THROWN, error
//!         Ok                          → FALLBACK_SUCCESS
//!     → request cache put (live result only)
//! ```
//!
//! # Design Decisions
//! - At most one fallback attempt per execution, no retries
//! - Each `execute()` starts a fresh `ExecutionRecord`; the handle's
//!   accessors report the latest one
//! - Registries are consulted on every execution so a handle never pins
//!   metrics or breakers beyond the registry's own lifetime

use std::sync::Arc;

use crate::circuit::{CircuitBreaker, CircuitBreakerFactory};
use crate::clock::Clock;
use crate::command::error::{
    CommandRuntimeError, ExecuteError, FailureKind, FallbackError, RunError, SharedError,
};
use crate::config::{CommandConfig, CommandConfigPatch};
use crate::metrics::{CommandMetrics, CommandMetricsFactory, Outcome};
use crate::observability::metrics as telemetry;
use crate::request::{ExecutionRecord, RequestCache, RequestLog};

/// A unit of risky work plus its degraded alternative.
pub trait Command {
    type Output: Clone + Send + Sync + 'static;

    /// The primary work.
    fn run(&mut self) -> Result<Self::Output, RunError>;

    /// Degraded result. `cause` is `None` when the request was short-circuited.
    fn fallback(&mut self, cause: Option<&SharedError>) -> Result<Self::Output, FallbackError> {
        let _ = cause;
        Err(FallbackError::NotAvailable)
    }

    /// Group key shared by every command that should trip together.
    /// Defaults to the type's name.
    fn command_key(&self) -> String {
        let name = std::any::type_name::<Self>();
        let base = name.split('<').next().unwrap_or(name);
        base.rsplit("::").next().unwrap_or(base).to_string()
    }

    /// Key for the request cache. `None` disables caching for this instance.
    fn cache_key(&self) -> Option<String> {
        None
    }

    /// Runs first on every `execute()`.
    fn prepare(&mut self) {}

    /// Called after each execution event is recorded.
    fn process_event(&mut self, outcome: Outcome) {
        let _ = outcome;
    }
}

/// A command bound to its resolved configuration and shared registries.
pub struct CommandHandle<C: Command> {
    command: C,
    command_key: String,
    config: CommandConfig,
    metrics_factory: Arc<CommandMetricsFactory>,
    circuit_breakers: Arc<CircuitBreakerFactory>,
    clock: Arc<dyn Clock>,
    request_cache: Option<RequestCache>,
    request_log: Option<RequestLog>,
    record: Arc<ExecutionRecord>,
}

impl<C: Command> CommandHandle<C> {
    pub(crate) fn new(
        command: C,
        config: CommandConfig,
        metrics_factory: Arc<CommandMetricsFactory>,
        circuit_breakers: Arc<CircuitBreakerFactory>,
        clock: Arc<dyn Clock>,
        request_cache: Option<RequestCache>,
        request_log: Option<RequestLog>,
    ) -> Self {
        let command_key = command.command_key();
        let record = Arc::new(ExecutionRecord::new(command_key.clone()));
        Self {
            command,
            command_key,
            config,
            metrics_factory,
            circuit_breakers,
            clock,
            request_cache,
            request_log,
            record,
        }
    }

    /// Run the command through cache, circuit breaker and fallback.
    pub fn execute(&mut self) -> Result<C::Output, ExecuteError> {
        self.command.prepare();
        self.record = Arc::new(ExecutionRecord::new(self.command_key.clone()));
        let metrics = self.metrics();

        if self.config.request_log.enabled {
            if let Some(log) = &self.request_log {
                log.add_executed_command(self.record.clone());
            }
        }

        let cache_target = self.cache_target();
        if let Some((cache, cache_key)) = &cache_target {
            if let Some(value) = cache.get::<C::Output>(&self.command_key, cache_key) {
                metrics.mark_response_from_cache();
                self.record_event(Outcome::ResponseFromCache);
                tracing::debug!(command = %self.command_key, cache_key = %cache_key, "Served from request cache");
                return Ok(value);
            }
        }

        let breaker = self.circuit_breaker(&metrics);
        if !breaker.allow_request() {
            metrics.mark_short_circuited();
            self.record_event(Outcome::ShortCircuited);
            tracing::debug!(command = %self.command_key, "Short-circuited");
            return self.fallback_or_error(&metrics, None);
        }

        let started = self.clock.now_millis();
        self.record.set_start_time(started);
        let result = match self.command.run() {
            Ok(value) => {
                self.record_execution_time(started);
                metrics.mark_success();
                breaker.mark_success();
                self.record_event(Outcome::Success);
                value
            }
            Err(RunError::BadRequest(err)) => {
                self.record_execution_time(started);
                tracing::debug!(command = %self.command_key, error = %err, "Bad request passed through");
                return Err(ExecuteError::BadRequest(err));
            }
            Err(RunError::Failure(err)) => {
                self.record_execution_time(started);
                metrics.mark_failure();
                let err: SharedError = Arc::from(err);
                self.record.set_error(err.clone());
                self.record_event(Outcome::Failure);
                tracing::debug!(command = %self.command_key, error = %err, "Command failed");
                self.fallback_or_error(&metrics, Some(err))?
            }
        };

        if let Some((cache, cache_key)) = cache_target {
            cache.put(&self.command_key, &cache_key, result.clone());
        }
        Ok(result)
    }

    fn fallback_or_error(
        &mut self,
        metrics: &CommandMetrics,
        original: Option<SharedError>,
    ) -> Result<C::Output, ExecuteError> {
        let failure = if !self.config.fallback.enabled {
            CommandRuntimeError::new(FailureKind::FallbackDisabled, &self.command_key, original, None)
        } else {
            match self.command.fallback(original.as_ref()) {
                Ok(value) => {
                    metrics.mark_fallback_success();
                    self.record_event(Outcome::FallbackSuccess);
                    return Ok(value);
                }
                Err(FallbackError::NotAvailable) => {
                    CommandRuntimeError::new(FailureKind::FallbackUnavailable, &self.command_key, original, None)
                }
                Err(FallbackError::Failed(err)) => {
                    metrics.mark_fallback_failure();
                    self.record_event(Outcome::FallbackFailure);
                    tracing::warn!(command = %self.command_key, error = %err, "Fallback failed");
                    CommandRuntimeError::new(
                        FailureKind::FallbackFailed,
                        &self.command_key,
                        original,
                        Some(Arc::from(err)),
                    )
                }
            }
        };

        metrics.mark_exception_thrown();
        self.record_event(Outcome::ExceptionThrown);
        Err(failure.into())
    }

    fn cache_target(&self) -> Option<(RequestCache, String)> {
        if !self.config.request_cache.enabled {
            return None;
        }
        let cache = self.request_cache.clone()?;
        let cache_key = self.command.cache_key()?;
        Some((cache, cache_key))
    }

    fn record_event(&mut self, outcome: Outcome) {
        self.record.push_event(outcome);
        self.command.process_event(outcome);
    }

    fn record_execution_time(&self, started: u64) {
        let elapsed = self.clock.now_millis() as i64 - started as i64;
        self.record.set_execution_time(elapsed);
        telemetry::record_latency(&self.command_key, elapsed);
    }

    fn circuit_breaker(&self, metrics: &Arc<CommandMetrics>) -> Arc<dyn CircuitBreaker> {
        self.circuit_breakers
            .get(&self.command_key, &self.config.circuit_breaker, metrics.clone())
    }

    /// Metrics of this command's group.
    pub fn metrics(&self) -> Arc<CommandMetrics> {
        self.metrics_factory.get(&self.command_key, &self.config.metrics)
    }

    /// Override configuration at runtime. With `merge` the patch is applied
    /// on top of the current config; without, it is applied to the defaults.
    pub fn set_config(&mut self, patch: &CommandConfigPatch, merge: bool) {
        if merge {
            self.config.merge(patch);
        } else {
            self.config = CommandConfig::default().merged(patch);
        }
    }

    pub fn config(&self) -> &CommandConfig {
        &self.config
    }

    pub fn command_key(&self) -> &str {
        &self.command_key
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut C {
        &mut self.command
    }

    /// Events of the latest execution, in order.
    pub fn execution_events(&self) -> Vec<Outcome> {
        self.record.events()
    }

    /// Time spent in `run()` by the latest execution; `None` if it never ran.
    pub fn execution_time(&self) -> Option<i64> {
        self.record.execution_time_ms()
    }

    /// When `run()` was invoked by the latest execution, in epoch milliseconds.
    pub fn execution_start_time(&self) -> Option<u64> {
        self.record.start_time_ms()
    }

    /// Error raised by `run()` in the latest execution.
    pub fn execution_error(&self) -> Option<SharedError> {
        self.record.error()
    }

    pub fn execution_record(&self) -> Arc<ExecutionRecord> {
        self.record.clone()
    }
}

impl<C: Command + std::fmt::Debug> std::fmt::Debug for CommandHandle<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandle")
            .field("command", &self.command)
            .field("command_key", &self.command_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
