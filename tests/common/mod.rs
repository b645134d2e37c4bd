//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use breakwater::clock::{Clock, ManualClock};
use breakwater::command::{Command, CommandFactory, FallbackError, RunError, SharedError};
use breakwater::config::{BreakwaterConfig, StorageConfig};
use breakwater::storage::{InMemoryStateStorage, StateStorage};

/// Fixed starting instant so bucket indices are reproducible.
pub const START_MILLIS: u64 = 1_369_861_562_000;

/// A factory over in-memory storage driven by a manual clock.
pub struct Harness {
    pub clock: ManualClock,
    pub storage: Arc<dyn StateStorage>,
    pub factory: CommandFactory,
}

impl Harness {
    pub fn new(config: BreakwaterConfig) -> Self {
        let clock = ManualClock::new(START_MILLIS);
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let storage = Arc::new(InMemoryStateStorage::with_clock(&StorageConfig::default(), shared));
        Self::with_storage(config, storage, clock)
    }

    pub fn with_storage(config: BreakwaterConfig, storage: Arc<dyn StateStorage>, clock: ManualClock) -> Self {
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let factory = CommandFactory::with_clock(config, storage.clone(), shared);
        Self {
            clock,
            storage,
            factory,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Work {
    Succeed(String),
    Fail(String),
    BadRequest(String),
}

#[derive(Debug, Clone)]
pub enum Fallback {
    Value(String),
    Unavailable,
    Fail(String),
}

/// Command whose behaviour is scripted by the test.
#[derive(Debug, Clone)]
pub struct ScriptedCommand {
    pub key: String,
    pub work: Work,
    pub fallback: Fallback,
    pub cache_key: Option<String>,
    pub latency: Option<(ManualClock, u64)>,
    pub runs: Arc<AtomicU32>,
    pub fallbacks: Arc<AtomicU32>,
}

impl ScriptedCommand {
    pub fn new(key: &str, work: Work) -> Self {
        Self {
            key: key.to_string(),
            work,
            fallback: Fallback::Unavailable,
            cache_key: None,
            latency: None,
            runs: Arc::new(AtomicU32::new(0)),
            fallbacks: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn succeeding(key: &str) -> Self {
        Self::new(key, Work::Succeed("result".to_string()))
    }

    pub fn failing(key: &str) -> Self {
        Self::new(key, Work::Fail("boom".to_string()))
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_cache_key(mut self, cache_key: &str) -> Self {
        self.cache_key = Some(cache_key.to_string());
        self
    }

    /// Advance `clock` by `millis` inside `run()`.
    pub fn with_latency(mut self, clock: &ManualClock, millis: u64) -> Self {
        self.latency = Some((clock.clone(), millis));
        self
    }

    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }

    pub fn fallbacks(&self) -> u32 {
        self.fallbacks.load(Ordering::SeqCst)
    }
}

impl Command for ScriptedCommand {
    type Output = String;

    fn run(&mut self) -> Result<String, RunError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, millis)) = &self.latency {
            clock.advance(*millis);
        }
        match &self.work {
            Work::Succeed(value) => Ok(value.clone()),
            Work::Fail(msg) => Err(RunError::failure(msg.clone())),
            Work::BadRequest(msg) => Err(RunError::bad_request(msg.clone())),
        }
    }

    fn fallback(&mut self, _cause: Option<&SharedError>) -> Result<String, FallbackError> {
        self.fallbacks.fetch_add(1, Ordering::SeqCst);
        match &self.fallback {
            Fallback::Value(value) => Ok(value.clone()),
            Fallback::Unavailable => Err(FallbackError::NotAvailable),
            Fallback::Fail(msg) => Err(FallbackError::failed(msg.clone())),
        }
    }

    fn command_key(&self) -> String {
        self.key.clone()
    }

    fn cache_key(&self) -> Option<String> {
        self.cache_key.clone()
    }
}
