//! Builds command handles wired to shared registries.

use std::sync::Arc;

use crate::circuit::CircuitBreakerFactory;
use crate::clock::{Clock, SystemClock};
use crate::command::{Command, CommandHandle};
use crate::config::BreakwaterConfig;
use crate::metrics::CommandMetricsFactory;
use crate::request::{RequestCache, RequestContext, RequestLog};
use crate::storage::StateStorage;

/// Entry point for executing commands.
///
/// Owns the per-key metrics and circuit breaker registries; clones share
/// them. Request-scoped collaborators are attached per logical request via
/// [`CommandFactory::with_request_context`].
#[derive(Debug, Clone)]
pub struct CommandFactory {
    config: Arc<BreakwaterConfig>,
    circuit_breakers: Arc<CircuitBreakerFactory>,
    metrics: Arc<CommandMetricsFactory>,
    clock: Arc<dyn Clock>,
    request_cache: Option<RequestCache>,
    request_log: Option<RequestLog>,
}

impl CommandFactory {
    pub fn new(config: BreakwaterConfig, storage: Arc<dyn StateStorage>) -> Self {
        Self::with_clock(config, storage, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BreakwaterConfig, storage: Arc<dyn StateStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config: Arc::new(config),
            circuit_breakers: Arc::new(CircuitBreakerFactory::new(storage.clone())),
            metrics: Arc::new(CommandMetricsFactory::with_clock(storage, clock.clone())),
            clock,
            request_cache: None,
            request_log: None,
        }
    }

    /// A factory sharing this one's registries whose commands use the
    /// context's cache and log.
    pub fn with_request_context(&self, context: &RequestContext) -> Self {
        Self {
            request_cache: Some(context.cache().clone()),
            request_log: Some(context.log().clone()),
            ..self.clone()
        }
    }

    pub fn with_request_cache(mut self, cache: RequestCache) -> Self {
        self.request_cache = Some(cache);
        self
    }

    pub fn with_request_log(mut self, log: RequestLog) -> Self {
        self.request_log = Some(log);
        self
    }

    /// Bind a command to its resolved config: defaults, then the override
    /// for its key.
    pub fn get_command<C: Command>(&self, command: C) -> CommandHandle<C> {
        let config = self.config.resolve(&command.command_key());
        CommandHandle::new(
            command,
            config,
            self.metrics.clone(),
            self.circuit_breakers.clone(),
            self.clock.clone(),
            self.request_cache.clone(),
            self.request_log.clone(),
        )
    }

    pub fn config(&self) -> &BreakwaterConfig {
        &self.config
    }

    pub fn metrics_factory(&self) -> &Arc<CommandMetricsFactory> {
        &self.metrics
    }

    pub fn circuit_breaker_factory(&self) -> &Arc<CircuitBreakerFactory> {
        &self.circuit_breakers
    }
}
