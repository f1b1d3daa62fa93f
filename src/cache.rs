//! Time-expiring result cache
//!
//! Maps resolved cache keys to result sets. Expiry is checked at read
//! time against a fixed TTL; expired entries are deleted by the lookup
//! that discovers them rather than by a background sweep. The cache is
//! capacity-bounded: inserting past capacity evicts the oldest entry.

use crate::types::GeocodeResult;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Default entry lifetime (1 hour)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
/// Default capacity bound
pub const DEFAULT_CACHE_CAPACITY: usize = 512;

struct CacheEntry {
    results: Vec<GeocodeResult>,
    created_at: Instant,
}

/// TTL result cache with lazy eviction
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Return the cached results for `key` if present and unexpired.
    ///
    /// An expired entry is removed as a side effect of the lookup.
    pub async fn get(&self, key: &str) -> Option<Vec<GeocodeResult>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.created_at.elapsed() <= self.ttl => {
                Some(entry.results.clone())
            }
            Some(_) => {
                tracing::debug!(key, "evicting expired cache entry");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `results` under `key`, stamped now.
    pub async fn set(&self, key: impl Into<String>, results: Vec<GeocodeResult>) {
        let key = key.into();
        let mut entries = self.entries.lock().await;

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                tracing::debug!(key = oldest, "cache full, evicting oldest entry");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                results,
                created_at: Instant::now(),
            },
        );
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
