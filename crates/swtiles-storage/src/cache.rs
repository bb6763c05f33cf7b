//! Tile Cache with LRU Eviction
//!
//! Remote byte sources pay a network round trip per fetch, and a tile read
//! costs two of them. The cache keeps recently fetched payloads in memory,
//! keyed by (level, row, col), so repeat reads of hot tiles skip the byte
//! source entirely.
//!
//! Budgeted by total payload bytes: inserting past the budget evicts least
//! recently used tiles until the new one fits. Caching is a reader
//! concern, not a format concern; archives are immutable, so entries never
//! go stale while a reader holds the same source.

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

/// Cache key: (level_id, row, col).
type TileKey = (u8, u32, u32);

/// In-memory LRU cache for tile payloads.
pub struct TileCache {
    max_bytes: u64,
    inner: Mutex<Inner>,
}

struct Inner {
    lru: LruCache<TileKey, Bytes>,
    current_bytes: u64,
}

impl TileCache {
    /// Create a cache holding at most `max_bytes` of payload data.
    pub fn new(max_bytes: u64) -> Self {
        // Entry count is unbounded; the byte budget is the working limit.
        Self {
            max_bytes,
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                current_bytes: 0,
            }),
        }
    }

    /// Look up a tile, refreshing its recency on hit.
    pub async fn get(&self, level_id: u8, row: u32, col: u32) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.lru.get(&(level_id, row, col)).cloned()
    }

    /// Insert a tile, evicting least recently used entries as needed.
    pub async fn put(&self, level_id: u8, row: u32, col: u32, payload: Bytes) {
        let size = payload.len() as u64;
        if size > self.max_bytes {
            tracing::warn!(
                size,
                max_bytes = self.max_bytes,
                "tile larger than the whole cache budget, not caching"
            );
            return;
        }

        let mut inner = self.inner.lock().await;
        let key = (level_id, row, col);
        if let Some(old) = inner.lru.put(key, payload) {
            inner.current_bytes = inner.current_bytes.saturating_sub(old.len() as u64);
        }
        inner.current_bytes += size;

        while inner.current_bytes > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((evicted_key, evicted)) => {
                    inner.current_bytes =
                        inner.current_bytes.saturating_sub(evicted.len() as u64);
                    tracing::debug!(?evicted_key, "evicted tile from cache");
                }
                None => break,
            }
        }
    }

    /// Current cache statistics.
    pub async fn stats(&self) -> CacheStats {
        let inner = self.inner.lock().await;
        CacheStats {
            current_bytes: inner.current_bytes,
            max_bytes: self.max_bytes,
            entry_count: inner.lru.len(),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub current_bytes: u64,
    pub max_bytes: u64,
    pub entry_count: usize,
}
