//! Request-scoped collaborators.
//!
//! # Data Flow
//! ```text
//! Caller begins a logical request
//!     → RequestContext::new() (fresh id, empty cache, empty log)
//!     → CommandFactory::with_request_context(&ctx)
//!     → every CommandHandle built from it shares the same cache and log
//!
//! CommandHandle::execute
//!     → log.rs add_executed_command (always, when logging is enabled)
//!     → cache.rs get / put (when caching is enabled and a cache key is set)
//! ```
//!
//! # Design Decisions
//! - Both collaborators are cheap `Arc` clones; dropping the context ends
//!   the request's lifetime
//! - No eviction in the cache; the request boundary is the eviction

pub mod cache;
pub mod log;

use uuid::Uuid;

pub use cache::RequestCache;
pub use log::{ExecutionRecord, RequestLog};

/// One logical request: an id for correlating log lines plus the cache and
/// log shared by the commands it runs.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    cache: RequestCache,
    log: RequestLog,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            cache: RequestCache::new(),
            log: RequestLog::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cache(&self) -> &RequestCache {
        &self.cache
    }

    pub fn log(&self) -> &RequestLog {
        &self.log
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
