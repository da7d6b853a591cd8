//! Bounded in-memory result caching
//!
//! Memoizes expensive computation results behind a TTL + LRU policy:
//! - Capacity bound with least-recently-used eviction
//! - Per-entry expiration so upstream model updates are picked up without a
//!   full flush
//! - Per-instance hit/miss/eviction counters
//!
//! The cache is an optimization, never a correctness dependency: a poisoned
//! lock degrades to a miss on `get` and a no-op on `put`, and callers fall
//! back to direct computation.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Cached value with TTL metadata
#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CachedEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Bounded TTL + LRU cache safe for concurrent get/put.
///
/// A single coarse mutex keeps the LRU bookkeeping consistent; lookups and
/// inserts are O(1) so the critical section stays short.
pub struct TtlLruCache<K: Hash + Eq, V: Clone> {
    store: Mutex<LruCache<K, CachedEntry<V>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl<K: Hash + Eq, V: Clone> TtlLruCache<K, V> {
    /// Create a cache holding at most `capacity` entries, each valid for
    /// `ttl`. A zero `ttl` disables storage entirely (every `put` is a
    /// no-op and every `get` a miss).
    pub fn with_config(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to >= 1");
        Self {
            store: Mutex::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Look up a cached value, promoting it to most-recently-used.
    ///
    /// Expired entries are evicted on access and count as misses.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut store = match self.store.lock() {
            Ok(guard) => guard,
            Err(err) => {
                warn!("result cache lock poisoned on get, treating as miss: {}", err);
                self.misses.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };

        let expired = match store.get(key) {
            Some(entry) if !entry.is_expired() => {
                let value = entry.value.clone();
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            store.pop(key);
            self.expirations.fetch_add(1, Ordering::Relaxed);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a value, evicting the least-recently-used entry when full.
    pub fn put(&self, key: K, value: V) {
        if self.ttl.is_zero() {
            return;
        }

        let mut store = match self.store.lock() {
            Ok(guard) => guard,
            Err(err) => {
                warn!("result cache lock poisoned on put, dropping entry: {}", err);
                return;
            }
        };

        if let Some((evicted_key, _)) = store.push(key, CachedEntry::new(value, self.ttl)) {
            // push returns the displaced pair both on same-key replacement
            // and on LRU eviction; only the latter is an eviction.
            if !store.contains(&evicted_key) {
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("result cache evicted least-recently-used entry");
            }
        }
    }

    /// Number of live entries (expired-but-unevicted entries included).
    pub fn len(&self) -> usize {
        self.store.lock().map(|store| store.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry, keeping counters intact.
    pub fn clear(&self) {
        if let Ok(mut store) = self.store.lock() {
            store.clear();
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

/// Cache performance statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

impl CacheStats {
    /// Hit rate percentage over all lookups so far.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
