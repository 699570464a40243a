//! In-memory cache-aside storage with insertion TTL and a size bound.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::task::JoinHandle;

/// Defines the behavior of the cache for a single lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present;
    /// otherwise, fetch from upstream and write the result to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from upstream, bypassing any cached entry,
    /// and write the new result to the cache.
    Refresh,
    /// Always fetch from upstream and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Use => "use",
            Self::Refresh => "refresh",
            Self::Bypass => "bypass",
        }
    }

    const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}

/// Expiry and capacity settings shared by every cache in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60 * 60),
            max_entries: 1000,
        }
    }
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
    generation: u64,
}

#[derive(Debug)]
struct CacheInner<K, V> {
    map: HashMap<K, CacheEntry<V>>,
    // Insertion order; entries whose generation no longer matches the map are stale.
    order: VecDeque<(K, u64)>,
    next_generation: u64,
}

impl<K, V> CacheInner<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            next_generation: 0,
        }
    }

    fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        self.map.get(key).and_then(|entry| {
            if entry.inserted_at.elapsed() < ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Inserts `value` and returns how many entries were evicted to make room.
    fn put(&mut self, key: K, value: V, max_entries: usize) -> u64 {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        self.map.insert(
            key.clone(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
                generation,
            },
        );
        self.order.push_back((key, generation));

        let mut evicted = 0;
        while self.map.len() > max_entries {
            let Some((oldest, oldest_generation)) = self.order.pop_front() else {
                break;
            };
            let current = self
                .map
                .get(&oldest)
                .is_some_and(|entry| entry.generation == oldest_generation);
            if current {
                self.map.remove(&oldest);
                evicted += 1;
            }
        }

        if self.order.len() > self.map.len().saturating_mul(2).max(16) {
            self.compact();
        }
        evicted
    }

    fn remove(&mut self, key: &K) -> bool {
        self.map.remove(key).is_some()
    }

    fn clear_expired(&mut self, ttl: Duration) -> usize {
        let before = self.map.len();
        self.map.retain(|_, entry| entry.inserted_at.elapsed() < ttl);
        self.compact();
        before - self.map.len()
    }

    fn compact(&mut self) {
        let map = &self.map;
        self.order.retain(|(key, generation)| {
            map.get(key)
                .is_some_and(|entry| entry.generation == *generation)
        });
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// Thread-safe in-memory cache with insertion-time expiry.
///
/// Values are replaced wholesale on overwrite. Once `max_entries` is exceeded
/// the oldest insertion is evicted.
#[derive(Debug)]
pub struct TtlCache<K, V> {
    inner: Arc<tokio::sync::RwLock<CacheInner<K, V>>>,
    counters: Arc<Counters>,
    config: CacheConfig,
}

impl<K, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            counters: Arc::clone(&self.counters),
            config: self.config,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner::new())),
            counters: Arc::new(Counters::default()),
            config,
        }
    }

    /// Create a disabled cache that never stores anything.
    pub fn disabled() -> Self {
        Self::new(CacheConfig {
            ttl: Duration::ZERO,
            max_entries: 0,
        })
    }

    pub const fn config(&self) -> CacheConfig {
        self.config
    }

    /// Check if the cache is disabled (TTL or capacity is zero).
    pub fn is_disabled(&self) -> bool {
        self.config.ttl == Duration::ZERO || self.config.max_entries == 0
    }

    /// Get a cached value for the given key if it exists and hasn't expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let found = {
            let store = self.inner.read().await;
            store.get(key, self.config.ttl)
        };

        let counter = if found.is_some() {
            &self.counters.hits
        } else {
            &self.counters.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Put a value into the cache. No-op when the cache is disabled.
    pub async fn put(&self, key: K, value: V) {
        if self.is_disabled() {
            return;
        }

        let evicted = {
            let mut store = self.inner.write().await;
            store.put(key, value, self.config.max_entries)
        };
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
        if evicted > 0 {
            self.counters.evictions.fetch_add(evicted, Ordering::Relaxed);
            tracing::debug!(evicted, "cache capacity reached; evicted oldest entries");
        }
    }

    /// Cache-aside read: return a live entry, otherwise run `loader` and store its success.
    ///
    /// Concurrent misses for the same key each run their own loader. Errors are
    /// returned unchanged and never stored.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: K, mode: CacheMode, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if mode.reads() {
            if let Some(value) = self.get(&key).await {
                return Ok(value);
            }
        }

        let value = loader().await?;
        if mode.writes() {
            self.put(key, value.clone()).await;
        }
        Ok(value)
    }

    pub async fn invalidate(&self, key: &K) -> bool {
        let mut store = self.inner.write().await;
        store.remove(key)
    }

    /// Remove expired entries from the cache, returning how many were dropped.
    pub async fn clear_expired(&self) -> usize {
        let mut store = self.inner.write().await;
        store.clear_expired(self.config.ttl)
    }

    /// Clear all entries from the cache.
    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.clear();
    }

    /// Get the number of entries in the cache (including expired entries).
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    /// Spawn a background task that purges expired entries every `interval`.
    pub fn spawn_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let removed = cache.clear_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache(ttl: Duration, max_entries: usize) -> TtlCache<String, String> {
        TtlCache::new(CacheConfig { ttl, max_entries })
    }

    #[tokio::test]
    async fn test_cache_basic_operations() {
        let cache = cache(Duration::from_secs(1), 10);

        assert!(cache.get(&"key1".to_string()).await.is_none());

        cache.put("key1".to_string(), "value1".to_string()).await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some("value1".to_string()));

        cache.put("key1".to_string(), "value2".to_string()).await;
        assert_eq!(cache.get(&"key1".to_string()).await, Some("value2".to_string()));
        assert_eq!(cache.len().await, 1);

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 2);
    }

    #[tokio::test]
    async fn test_cache_expiration_is_measured_from_insertion() {
        let cache = cache(Duration::from_millis(100), 10);

        cache.put("key1".to_string(), "value1".to_string()).await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        // Reading does not extend the lifetime.
        assert!(cache.get(&"key1".to_string()).await.is_some());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(cache.get(&"key1".to_string()).await.is_none());
    }

    #[tokio::test]
    async fn test_oldest_insertion_is_evicted_at_capacity() {
        let cache = cache(Duration::from_secs(60), 2);

        cache.put("a".to_string(), "1".to_string()).await;
        cache.put("b".to_string(), "2".to_string()).await;
        cache.put("a".to_string(), "1b".to_string()).await;
        cache.put("c".to_string(), "3".to_string()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&"b".to_string()).await.is_none());
        assert_eq!(cache.get(&"a".to_string()).await, Some("1b".to_string()));
        assert_eq!(cache.get(&"c".to_string()).await, Some("3".to_string()));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_get_or_fetch_stores_success_only() {
        let cache = cache(Duration::from_secs(60), 10);
        let loads = AtomicUsize::new(0);

        let failed: Result<String, &str> = cache
            .get_or_fetch("k".to_string(), CacheMode::Use, || async {
                loads.fetch_add(1, Ordering::SeqCst);
                Err("upstream down")
            })
            .await;
        assert_eq!(failed, Err("upstream down"));
        assert!(cache.is_empty().await);

        for _ in 0..3 {
            let value: Result<String, &str> = cache
                .get_or_fetch("k".to_string(), CacheMode::Use, || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok("v".to_string())
                })
                .await;
            assert_eq!(value, Ok("v".to_string()));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_and_bypass_modes() {
        let cache = cache(Duration::from_secs(60), 10);
        cache.put("k".to_string(), "old".to_string()).await;

        let bypassed: Result<String, ()> = cache
            .get_or_fetch("k".to_string(), CacheMode::Bypass, || async {
                Ok("bypass".to_string())
            })
            .await;
        assert_eq!(bypassed, Ok("bypass".to_string()));
        assert_eq!(cache.get(&"k".to_string()).await, Some("old".to_string()));

        let refreshed: Result<String, ()> = cache
            .get_or_fetch("k".to_string(), CacheMode::Refresh, || async {
                Ok("new".to_string())
            })
            .await;
        assert_eq!(refreshed, Ok("new".to_string()));
        assert_eq!(cache.get(&"k".to_string()).await, Some("new".to_string()));
    }

    #[tokio::test]
    async fn test_cache_clear_expired() {
        let cache = cache(Duration::from_millis(100), 10);

        cache.put("key1".to_string(), "value1".to_string()).await;
        cache.put("key2".to_string(), "value2".to_string()).await;
        assert_eq!(cache.len().await, 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(cache.clear_expired().await, 2);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let cache = cache(Duration::from_secs(60), 10);

        cache.put("key1".to_string(), "value1".to_string()).await;
        cache.put("key2".to_string(), "value2".to_string()).await;
        assert!(cache.invalidate(&"key1".to_string()).await);
        assert!(!cache.invalidate(&"key1".to_string()).await);
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_disabled() {
        let cache: TtlCache<String, String> = TtlCache::disabled();
        assert!(cache.is_disabled());

        cache.put("key1".to_string(), "value1".to_string()).await;
        assert!(cache.get(&"key1".to_string()).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_sweeper_purges_expired_entries() {
        let cache = cache(Duration::from_millis(20), 10);
        cache.put("key1".to_string(), "value1".to_string()).await;

        let handle = cache.spawn_sweeper(Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.abort();

        assert_eq!(cache.len().await, 0);
    }

    #[test]
    fn test_cache_mode_default() {
        let mode: CacheMode = Default::default();
        assert_eq!(mode, CacheMode::Use);
    }
}
