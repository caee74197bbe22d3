//! Response Cache
//!
//! Bounded, time-limited map from [`CacheKey`] to a previously obtained
//! value, a [`Response`] unless stated otherwise. Recency ordering comes from
//! `lru`; expiry is lazy and checked against the insertion time on every read.
//!
//! The whole map sits behind one mutex so eviction and TTL bookkeeping stay
//! consistent under concurrent `get`/`set`. No operation here suspends.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use lru::LruCache;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::config::CacheConfig;
use crate::types::{CacheKey, GatewayError, Response, Result};

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    last_accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: Instant) -> Self {
        Self {
            value,
            inserted_at: now,
            last_accessed_at: now,
        }
    }

    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) > ttl
    }
}

/// Snapshot for observability
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Entries physically held, including logically expired ones not yet read
    pub size: usize,
    pub max_entries: usize,
    /// Milliseconds
    #[serde(rename = "ttl")]
    pub ttl_ms: u64,
    /// Time since the least-recently-accessed entry was last read or written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_idle_ms: Option<u64>,
}

pub struct ResponseCache<V = Response> {
    max_entries: NonZeroUsize,
    ttl: Duration,
    inner: Mutex<LruCache<CacheKey, CacheEntry<V>>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(max_entries: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            max_entries,
            ttl,
            inner: Mutex::new(LruCache::new(max_entries)),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Result<Self> {
        let max_entries = NonZeroUsize::new(config.max_entries).ok_or_else(|| {
            GatewayError::Config("cache.max_entries must be greater than 0".to_string())
        })?;
        Ok(Self::new(max_entries, config.ttl()))
    }

    // A panic while holding the lock cannot leave the map half-updated
    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, CacheEntry<V>>> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Look up a value, promoting it to most-recently-used on a hit.
    ///
    /// An entry older than the TTL is dropped and reported as absent.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = Instant::now();
        let mut inner = self.lock();

        match inner.get_mut(key) {
            None => return None,
            Some(entry) if !entry.is_expired(now, self.ttl) => {
                entry.last_accessed_at = now;
                return Some(entry.value.clone());
            }
            Some(_) => {}
        }

        inner.pop(key);
        debug!(key = %key, "Cache entry expired");
        None
    }

    /// Insert or overwrite; evicts the least-recently-used entry when full
    pub fn set(&self, key: CacheKey, value: V) {
        let now = Instant::now();
        let mut inner = self.lock();

        let replaced_same_key = inner.contains(&key);
        if let Some((evicted, _)) = inner.push(key, CacheEntry::new(value, now))
            && !replaced_same_key
        {
            debug!(evicted = %evicted, "Cache full, evicted least recently used entry");
        }
    }

    /// Presence check that does not affect recency
    pub fn has(&self, key: &CacheKey) -> bool {
        let now = Instant::now();
        self.lock()
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now, self.ttl))
    }

    /// Remove one entry, returning whether it was present
    pub fn delete(&self, key: &CacheKey) -> bool {
        self.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Physically drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut inner = self.lock();

        let expired: Vec<CacheKey> = inner
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.pop(key);
        }

        if !expired.is_empty() {
            debug!(removed = expired.len(), "Purged expired cache entries");
        }
        expired.len()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        let inner = self.lock();

        CacheStats {
            size: inner.len(),
            max_entries: self.max_entries.get(),
            ttl_ms: self.ttl.as_millis() as u64,
            oldest_idle_ms: inner.peek_lru().map(|(_, entry)| {
                now.saturating_duration_since(entry.last_accessed_at)
                    .as_millis() as u64
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn cache(max_entries: usize, ttl_ms: u64) -> ResponseCache {
        ResponseCache::new(
            NonZeroUsize::new(max_entries).unwrap(),
            Duration::from_millis(ttl_ms),
        )
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::new(name, None)
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_stored_response_until_ttl() {
        let cache = cache(10, 1_000);
        cache.set(key("a"), Response::new("alpha"));

        tokio::time::advance(Duration::from_millis(1_000)).await;
        assert_eq!(cache.get(&key("a")).unwrap().text, "alpha");

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(cache.get(&key("a")).is_none());
        // Expired read drops the entry
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_do_not_extend_ttl() {
        let cache = cache(10, 1_000);
        cache.set(key("a"), Response::new("alpha"));

        for _ in 0..3 {
            tokio::time::advance(Duration::from_millis(400)).await;
            let _ = cache.get(&key("a"));
        }
        assert!(cache.get(&key("a")).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_has_respects_ttl() {
        let cache = cache(10, 1_000);
        cache.set(key("a"), Response::new("alpha"));
        assert!(cache.has(&key("a")));

        tokio::time::advance(Duration::from_millis(1_500)).await;
        assert!(!cache.has(&key("a")));
        // Logically absent but still physically held
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_evicts_least_recently_accessed() {
        let cache = cache(2, 60_000);
        cache.set(key("a"), Response::new("a"));
        cache.set(key("b"), Response::new("b"));

        // Touch "a" so "b" becomes least recently used
        assert!(cache.get(&key("a")).is_some());
        cache.set(key("c"), Response::new("c"));

        assert!(cache.has(&key("a")));
        assert!(!cache.has(&key("b")));
        assert!(cache.has(&key("c")));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_has_does_not_promote() {
        let cache = cache(2, 60_000);
        cache.set(key("a"), Response::new("a"));
        cache.set(key("b"), Response::new("b"));

        assert!(cache.has(&key("a")));
        cache.set(key("c"), Response::new("c"));

        assert!(!cache.has(&key("a")));
        assert!(cache.has(&key("b")));
    }

    #[test]
    fn test_overwrite_keeps_size() {
        let cache = cache(2, 60_000);
        cache.set(key("a"), Response::new("first"));
        cache.set(key("a"), Response::new("second"));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key("a")).unwrap().text, "second");
    }

    #[test]
    fn test_delete_and_clear() {
        let cache = cache(4, 60_000);
        cache.set(key("a"), Response::new("a"));
        cache.set(key("b"), Response::new("b"));

        assert!(cache.delete(&key("a")));
        assert!(!cache.delete(&key("a")));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = cache(10, 1_000);
        cache.set(key("old"), Response::new("old"));
        tokio::time::advance(Duration::from_millis(800)).await;
        cache.set(key("new"), Response::new("new"));
        tokio::time::advance(Duration::from_millis(300)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.has(&key("new")));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats() {
        let cache = cache(3, 5_000);
        assert_eq!(
            cache.stats(),
            CacheStats {
                size: 0,
                max_entries: 3,
                ttl_ms: 5_000,
                oldest_idle_ms: None,
            }
        );

        cache.set(key("a"), Response::new("a"));
        tokio::time::advance(Duration::from_millis(250)).await;
        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.oldest_idle_ms, Some(250));
    }

    #[test]
    fn test_from_config_rejects_zero_capacity() {
        let config = CacheConfig {
            max_entries: 0,
            ttl_ms: 1_000,
        };
        assert!(ResponseCache::<Response>::from_config(&config).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_holds_embedding_vectors() {
        let cache: ResponseCache<Vec<f32>> =
            ResponseCache::new(NonZeroUsize::new(4).unwrap(), Duration::from_millis(1_000));
        cache.set(key("tokio"), vec![0.25, -0.5]);
        assert_eq!(cache.get(&key("tokio")), Some(vec![0.25, -0.5]));

        tokio::time::advance(Duration::from_millis(1_001)).await;
        assert_eq!(cache.get(&key("tokio")), None);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u8..20, 0..64),
        ) {
            let cache = cache(capacity, 60_000);
            for k in keys {
                cache.set(key(&k.to_string()), Response::new(k.to_string()));
                prop_assert!(cache.len() <= capacity);
            }
        }

        #[test]
        fn prop_most_recent_insert_always_present(
            capacity in 1usize..8,
            keys in proptest::collection::vec(0u8..20, 1..64),
        ) {
            let cache = cache(capacity, 60_000);
            for k in &keys {
                cache.set(key(&k.to_string()), Response::new(k.to_string()));
            }
            let last = keys.last().unwrap().to_string();
            prop_assert_eq!(cache.get(&key(&last)).map(|r| r.text), Some(last));
        }
    }
}
