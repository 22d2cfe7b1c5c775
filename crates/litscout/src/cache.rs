//! Keyed, TTL-bound, size-bounded result cache.
//!
//! Shared by query-plan generation, relevance scoring, and citation-map
//! assembly. Writes are insert-or-replace; eviction is size-triggered
//! (past 1000 entries the 100 oldest by timestamp are dropped), not LRU.
//! The clock is injected so TTL behavior is testable.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};

use crate::clock::Clock;
use crate::config::engine;

/// A cached value and the instant it was stored.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    stored_at: DateTime<Utc>,
}

/// TTL cache for engine-level results.
#[derive(Debug)]
pub struct ResultCache<T> {
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
    ttl: Duration,
    max_entries: usize,
    evict_batch: usize,
    clock: Arc<dyn Clock>,
}

impl<T: Clone> ResultCache<T> {
    /// Create a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            max_entries: engine::CACHE_MAX_ENTRIES,
            evict_batch: engine::CACHE_EVICT_BATCH,
            clock,
        }
    }

    /// Create a cache with explicit size bounds (used by tests).
    #[must_use]
    pub fn with_bounds(
        ttl: Duration,
        max_entries: usize,
        evict_batch: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { entries: Mutex::new(HashMap::new()), ttl, max_entries, evict_batch, clock }
    }

    /// Look up a key. An entry is usable only while `now - stored_at < ttl`;
    /// expired entries are removed on read.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<T> {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if now - entry.stored_at < self.ttl => {
                tracing::debug!(key, "cache hit");
                Some(entry.value.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insert or replace a value, then evict the oldest batch if the map
    /// has grown past its bound.
    pub fn insert(&self, key: impl Into<String>, value: T) {
        let now = self.clock.now();
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        entries.insert(key.into(), CacheEntry { value, stored_at: now });

        if entries.len() > self.max_entries {
            let mut by_age: Vec<(String, DateTime<Utc>)> =
                entries.iter().map(|(k, e)| (k.clone(), e.stored_at)).collect();
            by_age.sort_by_key(|(_, stored_at)| *stored_at);
            let dropped = by_age.len().min(self.evict_batch);
            for (key, _) in by_age.into_iter().take(self.evict_batch) {
                entries.remove(&key);
            }
            tracing::debug!(dropped, remaining = entries.len(), "cache eviction");
        }
    }

    /// Number of live entries (expired-but-unread entries included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock poisoned").len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Build a cache key by hashing the given parts (md5, hex-encoded).
#[must_use]
pub fn cache_key(parts: &[&str]) -> String {
    use md5::{Digest, Md5};

    let mut hasher = Md5::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn manual_clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc::now()))
    }

    #[test]
    fn test_hit_within_ttl_miss_after() {
        let clock = manual_clock();
        let cache: ResultCache<String> = ResultCache::new(Duration::hours(24), clock.clone());

        cache.insert("k", "v".to_string());
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::hours(23));
        assert_eq!(cache.get("k"), Some("v".to_string()));

        clock.advance(Duration::hours(2));
        assert_eq!(cache.get("k"), None);
        // Expired entry was dropped on read.
        assert!(cache.is_empty());
    }

    #[test]
    fn test_insert_replaces() {
        let cache: ResultCache<i32> = ResultCache::new(Duration::hours(1), manual_clock());
        cache.insert("k", 1);
        cache.insert("k", 2);
        assert_eq!(cache.get("k"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_size_triggered_eviction_drops_oldest() {
        let clock = manual_clock();
        let cache: ResultCache<usize> =
            ResultCache::with_bounds(Duration::hours(24), 10, 3, clock.clone());

        for i in 0..10 {
            cache.insert(format!("k{i}"), i);
            clock.advance(Duration::seconds(1));
        }
        assert_eq!(cache.len(), 10);

        // The 11th insert trips eviction of the 3 oldest.
        cache.insert("k10", 10);
        assert_eq!(cache.len(), 8);
        assert_eq!(cache.get("k0"), None);
        assert_eq!(cache.get("k1"), None);
        assert_eq!(cache.get("k2"), None);
        assert_eq!(cache.get("k3"), Some(3));
        assert_eq!(cache.get("k10"), Some(10));
    }

    #[test]
    fn test_cache_key_stable_and_distinct() {
        let a = cache_key(&["topic", "scholar"]);
        let b = cache_key(&["topic", "scholar"]);
        let c = cache_key(&["topic", "pubmed"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
