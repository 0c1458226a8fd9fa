//! Bounded LRU cache for prediction results.
//!
//! Reads are lock-free through dashmap's sharding; recency is tracked with
//! a logical clock stored per entry so a hit never takes a write lock.
//! Eviction scans for the oldest entries and removes a small batch, which
//! at the default capacity is negligible next to a prediction.

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Default cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Fraction of entries evicted when the cache is full
const EVICTION_BATCH_FRACTION: usize = 10;

/// Cache key: sha256 of the lowercased filename plus the model version
pub fn canonical_fingerprint(filename: &str, model_version: &str) -> String {
    let digest = Sha256::digest(filename.to_lowercase().as_bytes());
    format!("{}:{model_version}", hex::encode(digest))
}

struct CacheEntry<V> {
    value: V,
    last_used: AtomicU64,
}

/// Bounded concurrent cache with LRU eviction
pub struct PredictionCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    capacity: usize,
    clock: AtomicU64,
}

impl<V: Clone> Default for PredictionCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl<V: Clone> PredictionCache<V> {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity: capacity.max(1),
            clock: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.entries.get(key)?;
        let now = self.clock.fetch_add(1, Ordering::Relaxed);
        entry.last_used.store(now, Ordering::Relaxed);
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: V) {
        if self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        let now = self.clock.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key,
            CacheEntry {
                value,
                last_used: AtomicU64::new(now),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    fn evict_oldest(&self) {
        let batch = (self.capacity / EVICTION_BATCH_FRACTION).max(1);
        let mut ages: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.last_used.load(Ordering::Relaxed)))
            .collect();
        ages.sort_by_key(|(_, age)| *age);
        for (key, _) in ages.into_iter().take(batch) {
            self.entries.remove(&key);
        }
        tracing::debug!(evicted = batch, "Prediction cache eviction");
    }
}
