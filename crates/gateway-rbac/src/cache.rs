//! Small bounded caches with per-entry expiry.

use lru::LruCache;
use parking_lot::Mutex;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Cache configuration.
#[derive(Debug, Clone, Copy)]
pub struct CacheConfig {
    /// Maximum number of cached entries.
    pub capacity: usize,
    /// TTL for cached entries.
    pub ttl: Duration,
}

impl CacheConfig {
    /// Creates a configuration.
    #[must_use]
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity, ttl }
    }
}

struct CacheEntry<V> {
    value: V,
    cached_at: Instant,
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Cache hits.
    pub hits: u64,
    /// Cache misses, including expired entries.
    pub misses: u64,
}

/// LRU cache whose entries expire after a fixed TTL.
pub struct TtlCache<K: Hash + Eq, V: Clone> {
    entries: Mutex<LruCache<K, CacheEntry<V>>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl<K: Hash + Eq, V: Clone> TtlCache<K, V> {
    /// Creates a new cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stats: Mutex::new(CacheStats::default()),
            ttl: config.ttl,
        }
    }

    /// Returns a live cached value.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock();
        let fresh = entries
            .get(key)
            .map(|entry| (entry.cached_at.elapsed() <= self.ttl).then(|| entry.value.clone()));
        let live = match fresh {
            Some(Some(value)) => Some(value),
            Some(None) => {
                entries.pop(key);
                None
            }
            None => None,
        };
        drop(entries);

        let mut stats = self.stats.lock();
        if live.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        live
    }

    /// Stores a value.
    pub fn insert(&self, key: K, value: V) {
        self.entries.lock().put(
            key,
            CacheEntry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    /// Returns the cached value or computes and stores it.
    ///
    /// Errors from `load` are returned and nothing is cached.
    pub fn get_or_try_insert<E>(&self, key: K, load: impl FnOnce() -> Result<V, E>) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = load()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Invalidates a specific key.
    pub fn invalidate(&self, key: &K) {
        self.entries.lock().pop(key);
    }

    /// Clears the cache.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    /// Returns the number of entries, live or expired.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
