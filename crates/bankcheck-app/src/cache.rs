// Client-side key/value cache.
//
// Three well-known keys hold locally cached history; all three are
// removed together on every sign-out path, whether or not the remote
// sign-out succeeded.

use std::collections::HashMap;
use std::sync::Mutex;

pub const FRAUD_HISTORY_KEY: &str = "bankcheck.fraud_history";
pub const CHECK_HISTORY_KEY: &str = "bankcheck.check_history";
pub const ACCOUNT_DB_KEY: &str = "bankcheck.account_db";

/// All keys purged on sign-out.
pub const SESSION_KEYS: &[&str] = &[FRAUD_HISTORY_KEY, CHECK_HISTORY_KEY, ACCOUNT_DB_KEY];

/// String key/value store (browser local storage, a file, or memory).
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Remove every session-scoped key. Removal of an absent key is
/// harmless; failures here must never block a sign-out.
pub fn purge_session_keys(cache: &dyn LocalCache) {
    for key in SESSION_KEYS {
        cache.remove(key);
    }
}

/// In-memory cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalCache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.map
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert!(cache.get(CHECK_HISTORY_KEY).is_none());
        cache.set(CHECK_HISTORY_KEY, "[1,2,3]");
        assert_eq!(cache.get(CHECK_HISTORY_KEY).as_deref(), Some("[1,2,3]"));
        cache.remove(CHECK_HISTORY_KEY);
        assert!(cache.get(CHECK_HISTORY_KEY).is_none());
    }

    #[test]
    fn test_purge_removes_all_session_keys() {
        let cache = MemoryCache::new();
        for key in SESSION_KEYS {
            cache.set(key, "data");
        }
        cache.set("bankcheck.theme", "dark");

        purge_session_keys(&cache);

        for key in SESSION_KEYS {
            assert!(cache.get(key).is_none());
        }
        // Unrelated keys survive.
        assert_eq!(cache.get("bankcheck.theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_purge_on_empty_cache_is_harmless() {
        let cache = MemoryCache::new();
        purge_session_keys(&cache);
        purge_session_keys(&cache);
    }
}
