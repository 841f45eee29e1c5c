//! Bounded read cache using Moka.
//!
//! Moka bounds the number of entries; expiry is judged against the injected
//! [`Clock`] so read paths and tests agree on what "stale" means.

use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use moka::sync::Cache;

use crate::clock::SharedClock;

#[derive(Clone)]
struct Stamped<V> {
    stored_at: DateTime<Utc>,
    value: V,
}

/// Size-bounded cache whose entries expire after a fixed TTL.
///
/// Thread-safe and cheap to clone; clones share the same storage.
pub struct TtlCache<K, V> {
    cache: Cache<K, Stamped<V>>,
    ttl: Duration,
    clock: SharedClock,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            ttl: self.ttl,
            clock: self.clock.clone(),
        }
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("ttl", &self.ttl)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with custom capacity and TTL.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl: Duration, clock: SharedClock) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache, ttl, clock }
    }

    /// Returns the cached value unless it is missing or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.cache.get(key)?;
        if self.clock.now() - entry.stored_at >= self.ttl {
            self.cache.invalidate(key);
            return None;
        }
        Some(entry.value)
    }

    /// Stores a value, replacing any previous entry for the key.
    pub fn insert(&self, key: K, value: V) {
        let stamped = Stamped {
            stored_at: self.clock.now(),
            value,
        };
        self.cache.insert(key, stamped);
    }

    /// Drops one entry.
    pub fn invalidate(&self, key: &K) {
        self.cache.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn cache_with_clock(ttl_secs: i64) -> (TtlCache<u32, String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let shared: SharedClock = clock.clone();
        (
            TtlCache::with_config(16, Duration::seconds(ttl_secs), shared),
            clock,
        )
    }

    #[test]
    fn returns_fresh_entries() {
        let (cache, _clock) = cache_with_clock(30);
        cache.insert(1, "one".to_string());
        assert_eq!(cache.get(&1).as_deref(), Some("one"));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn entries_expire_with_the_injected_clock() {
        let (cache, clock) = cache_with_clock(30);
        cache.insert(1, "one".to_string());

        clock.advance(Duration::seconds(29));
        assert!(cache.get(&1).is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get(&1).is_none());
    }

    #[test]
    fn reinsert_restarts_ttl() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert(7, "a".to_string());
        clock.advance(Duration::seconds(8));
        cache.insert(7, "b".to_string());
        clock.advance(Duration::seconds(8));
        assert_eq!(cache.get(&7).as_deref(), Some("b"));
    }

    #[test]
    fn invalidate_removes_entries() {
        let (cache, _clock) = cache_with_clock(30);
        cache.insert(1, "one".to_string());
        cache.insert(2, "two".to_string());

        cache.invalidate(&1);
        assert!(cache.get(&1).is_none());
        assert!(cache.get(&2).is_some());
    }
}
