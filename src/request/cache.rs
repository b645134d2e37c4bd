//! Per-request memo of command results.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

type CachedValue = Arc<dyn Any + Send + Sync>;

/// Results keyed by (command key, cache key) for one logical request.
///
/// There is no eviction: the cache lives as long as the request that owns
/// it, or until entries are cleared explicitly. Clones share the same map.
#[derive(Clone, Default)]
pub struct RequestCache {
    inner: Arc<DashMap<String, HashMap<String, CachedValue>>>,
}

impl std::fmt::Debug for RequestCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCache")
            .field("commands", &self.inner.len())
            .finish()
    }
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self, command_key: &str, cache_key: &str) -> bool {
        self.inner
            .get(command_key)
            .is_some_and(|entries| entries.contains_key(cache_key))
    }

    /// The cached value, if present and of type `T`.
    pub fn get<T>(&self, command_key: &str, cache_key: &str) -> Option<T>
    where
        T: Clone + 'static,
    {
        let entries = self.inner.get(command_key)?;
        entries.get(cache_key)?.downcast_ref::<T>().cloned()
    }

    pub fn put<T>(&self, command_key: &str, cache_key: &str, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.inner
            .entry(command_key.to_string())
            .or_default()
            .insert(cache_key.to_string(), Arc::new(value));
    }

    /// Remove one cached result.
    pub fn clear(&self, command_key: &str, cache_key: &str) {
        if let Some(mut entries) = self.inner.get_mut(command_key) {
            entries.remove(cache_key);
        }
    }

    /// Remove every cached result of a command key.
    pub fn clear_all(&self, command_key: &str) {
        self.inner.remove(command_key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_exists() {
        let cache = RequestCache::new();
        assert!(!cache.exists("TestCommand", "cache-key"));
        assert_eq!(cache.get::<String>("TestCommand", "cache-key"), None);

        cache.put("TestCommand", "cache-key", "result".to_string());

        assert!(cache.exists("TestCommand", "cache-key"));
        assert!(!cache.exists("TestCommand", "other-key"));
        assert!(!cache.exists("OtherCommand", "cache-key"));
        assert_eq!(
            cache.get::<String>("TestCommand", "cache-key").as_deref(),
            Some("result")
        );
    }

    #[test]
    fn test_get_with_wrong_type() {
        let cache = RequestCache::new();
        cache.put("TestCommand", "k", 42_u32);
        assert_eq!(cache.get::<String>("TestCommand", "k"), None);
        assert_eq!(cache.get::<u32>("TestCommand", "k"), Some(42));
    }

    #[test]
    fn test_clear() {
        let cache = RequestCache::new();
        cache.put("TestCommand", "a", 1_u8);
        cache.put("TestCommand", "b", 2_u8);

        cache.clear("TestCommand", "a");
        cache.clear("TestCommand", "missing");
        cache.clear("MissingCommand", "a");

        assert!(!cache.exists("TestCommand", "a"));
        assert!(cache.exists("TestCommand", "b"));
    }

    #[test]
    fn test_clear_all_only_touches_one_command() {
        let cache = RequestCache::new();
        cache.put("TestCommand", "a", 1_u8);
        cache.put("TestCommand", "b", 2_u8);
        cache.put("OtherCommand", "a", 3_u8);

        cache.clear_all("TestCommand");

        assert!(!cache.exists("TestCommand", "a"));
        assert!(!cache.exists("TestCommand", "b"));
        assert!(cache.exists("OtherCommand", "a"));
    }

    #[test]
    fn test_clones_share_entries() {
        let cache = RequestCache::new();
        let shared = cache.clone();
        shared.put("TestCommand", "a", 1_u8);
        assert!(cache.exists("TestCommand", "a"));
    }
}
