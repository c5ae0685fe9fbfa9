//! Cache store seam and the in-memory implementation.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use lru::LruCache;
use metrics::counter;
use thiserror::Error;
use tracing::debug;

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const METRIC_STORE_EVICT: &str = "viewcache_store_evict_total";

/// Failure reported by a cache store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {message}")]
    Unavailable { message: String },
    #[error("cache store rejected `{key}`: {message}")]
    Rejected { key: String, message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn rejected(key: &CacheKey, message: impl Into<String>) -> Self {
        Self::Rejected {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Key/value store holding rendered views.
///
/// Implementations own expiry and eviction; callers only pass a TTL hint on
/// write. Must be safe to share between request-handling threads.
pub trait CacheStore: Send + Sync {
    fn exists(&self, key: &CacheKey) -> Result<bool, StoreError>;

    /// Returns `None` when the entry vanished between `exists` and `get`.
    fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), StoreError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// LRU-bounded in-process store with per-entry expiry.
pub struct MemoryStore {
    entries: RwLock<LruCache<CacheKey, Entry>>,
}

impl MemoryStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(config.max_entries_non_zero())),
        }
    }

    pub fn invalidate(&self, key: &CacheKey) {
        rw_write(&self.entries, SOURCE, "invalidate").pop(key);
    }

    pub fn invalidate_all(&self) {
        rw_write(&self.entries, SOURCE, "invalidate_all").clear();
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn exists(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let now = Instant::now();
        let entries = rw_read(&self.entries, SOURCE, "exists");
        Ok(entries.peek(key).is_some_and(|entry| entry.is_live(now)))
    }

    fn get(&self, key: &CacheKey) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.pop(key);
                debug!(key = %key, "dropped expired view");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn set(&self, key: &CacheKey, value: String, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now()
            .checked_add(ttl)
            .ok_or_else(|| StoreError::rejected(key, "ttl overflows the clock"))?;
        let evicted = rw_write(&self.entries, SOURCE, "set").push(
            key.clone(),
            Entry { value, expires_at },
        );
        match evicted {
            Some((evicted_key, _)) if evicted_key != *key => {
                counter!(METRIC_STORE_EVICT).increment(1);
                debug!(key = %evicted_key, "evicted view to make room");
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::thread;

    use super::*;

    fn store_with_limit(max_entries: usize) -> MemoryStore {
        MemoryStore::new(&CacheConfig {
            max_entries,
            ..Default::default()
        })
    }

    #[test]
    fn set_then_get_roundtrip() {
        let store = store_with_limit(8);
        let key = CacheKey::from("view:page:home");

        assert!(!store.exists(&key).unwrap());
        assert!(store.get(&key).unwrap().is_none());

        store
            .set(&key, "<h1>home</h1>".to_string(), Duration::from_secs(60))
            .unwrap();

        assert!(store.exists(&key).unwrap());
        assert_eq!(store.get(&key).unwrap().as_deref(), Some("<h1>home</h1>"));
    }

    #[test]
    fn expired_entries_are_absent() {
        let store = store_with_limit(8);
        let key = CacheKey::from("view:block:nav");

        store
            .set(&key, "nav".to_string(), Duration::from_millis(5))
            .unwrap();
        thread::sleep(Duration::from_millis(20));

        assert!(!store.exists(&key).unwrap());
        assert!(store.get(&key).unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn lru_eviction_drops_oldest() {
        let store = store_with_limit(2);
        let ttl = Duration::from_secs(60);
        let first = CacheKey::from("one");
        let second = CacheKey::from("two");
        let third = CacheKey::from("three");

        store.set(&first, "1".to_string(), ttl).unwrap();
        store.set(&second, "2".to_string(), ttl).unwrap();
        store.set(&third, "3".to_string(), ttl).unwrap();

        assert!(!store.exists(&first).unwrap());
        assert!(store.exists(&second).unwrap());
        assert!(store.exists(&third).unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn invalidate_removes_entries() {
        let store = store_with_limit(8);
        let ttl = Duration::from_secs(60);
        let key = CacheKey::from("view:page:about");

        store.set(&key, "about".to_string(), ttl).unwrap();
        store.invalidate(&key);
        assert!(!store.exists(&key).unwrap());

        store.set(&key, "about".to_string(), ttl).unwrap();
        store.invalidate_all();
        assert!(store.is_empty());
    }

    #[test]
    fn overflowing_ttl_is_rejected() {
        let store = store_with_limit(8);
        let key = CacheKey::from("forever");

        let err = store
            .set(&key, "x".to_string(), Duration::MAX)
            .expect_err("ttl past the clock range");
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn store_recovers_from_poisoned_lock() {
        let store = store_with_limit(8);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = store
                .entries
                .write()
                .expect("entries lock should be acquired");
            panic!("poison entries lock");
        }));

        let key = CacheKey::from("after-panic");
        store
            .set(&key, "ok".to_string(), Duration::from_secs(1))
            .unwrap();
        assert!(store.exists(&key).unwrap());
    }
}
