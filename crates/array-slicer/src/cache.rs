//! Time-bounded cache of coordinate arrays.
//!
//! Coordinate arrays are re-read for every variable of every request
//! against the same store. The cache is an owned object handed to the
//! resolver, so its lifetime is the caller's, not the process's.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::SlicerConfig;
use crate::error::Result;
use crate::store::ArrayStore;

/// Cache key: (store location, array name).
type CoordinateKey = (String, String);

struct CachedCoordinates {
    values: Arc<Vec<f64>>,
    inserted_at: Instant,
}

/// LRU cache of decoded 1-D coordinate arrays with a per-entry TTL.
pub struct CoordinateCache {
    entries: RwLock<LruCache<CoordinateKey, CachedCoordinates>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CoordinateCache {
    /// Create a cache holding at most `capacity` arrays for `ttl` each.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &SlicerConfig) -> Self {
        Self::new(config.coordinate_cache_capacity, config.coordinate_cache_ttl())
    }

    /// Cached coordinates, or `None` when missing or expired.
    pub async fn get(&self, location: &str, name: &str) -> Option<Arc<Vec<f64>>> {
        let key = (location.to_string(), name.to_string());
        let mut entries = self.entries.write().await;

        let expired = match entries.get(&key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.values.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(&key);
            debug!(location, array = name, "Coordinate cache entry expired");
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub async fn insert(&self, location: &str, name: &str, values: Arc<Vec<f64>>) {
        let entry = CachedCoordinates {
            values,
            inserted_at: Instant::now(),
        };
        self.entries
            .write()
            .await
            .put((location.to_string(), name.to_string()), entry);
    }

    /// Read-through lookup: load `name` from `store` on a miss.
    pub async fn get_or_load(&self, store: &dyn ArrayStore, name: &str) -> Result<Arc<Vec<f64>>> {
        if let Some(values) = self.get(store.location(), name).await {
            return Ok(values);
        }
        let values = Arc::new(store.read_coordinates(name).await?);
        self.insert(store.location(), name, values.clone()).await;
        Ok(values)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for CoordinateCache {
    fn default() -> Self {
        Self::from_config(&SlicerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArrayStore;

    #[tokio::test]
    async fn test_read_through() {
        let store = MemoryArrayStore::new("mem://grid").with_coordinate("lat", vec![1.0, 2.0]);
        let cache = CoordinateCache::new(4, Duration::from_secs(60));

        let first = cache.get_or_load(&store, "lat").await.unwrap();
        let second = cache.get_or_load(&store, "lat").await.unwrap();
        assert_eq!(*first, vec![1.0, 2.0]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.reads(), 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[tokio::test]
    async fn test_expired_entries_reload() {
        let store = MemoryArrayStore::new("mem://grid").with_coordinate("lat", vec![1.0]);
        let cache = CoordinateCache::new(4, Duration::ZERO);

        cache.get_or_load(&store, "lat").await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        cache.get_or_load(&store, "lat").await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_capacity_evicts_least_recent() {
        let cache = CoordinateCache::new(2, Duration::from_secs(60));
        for name in ["a", "b", "c"] {
            cache.insert("mem://", name, Arc::new(vec![0.0])).await;
        }
        assert_eq!(cache.len().await, 2);
        assert!(cache.get("mem://", "a").await.is_none());
        assert!(cache.get("mem://", "c").await.is_some());
    }

    #[tokio::test]
    async fn test_keys_include_location() {
        let cache = CoordinateCache::new(4, Duration::from_secs(60));
        cache.insert("mem://one", "lat", Arc::new(vec![1.0])).await;
        assert!(cache.get("mem://two", "lat").await.is_none());
    }
}
