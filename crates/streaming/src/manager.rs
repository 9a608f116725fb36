use foundation::time::Clock;

use crate::cache::{TileCache, TileCacheConfig, TileCacheStats, TileLookup};
use crate::fetch::TileFetcher;
use crate::store::{StoredTileMeta, TileStore};
use crate::tile::TileKey;

/// How a tile request was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileResponse {
    /// Served from the cache.
    Cached(Vec<u8>),
    /// Fetched from the network and cached.
    Fetched(Vec<u8>),
    /// Not cached and not fetchable (offline, or the fetch failed).
    /// The renderer shows a placeholder; this is not an error.
    Unavailable,
}

/// Result of a `put`, reported as status rather than an error: cache I/O
/// failures degrade to "not cached", they never propagate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PutOutcome {
    pub stored: bool,
    pub evicted: Vec<TileKey>,
}

/// Tile cache facade: in-memory TTL + LRU index over persistent payload
/// storage, with explicit offline semantics.
///
/// Storage writes complete before the index is updated, so `stats()`
/// never undercounts stored tiles. Storage failures are logged and
/// treated as misses; nothing here returns an error across the public
/// API.
#[derive(Debug)]
pub struct TileCacheManager<S: TileStore, C: Clock> {
    cache: TileCache,
    store: S,
    clock: C,
    offline: bool,
}

impl<S: TileStore, C: Clock> TileCacheManager<S, C> {
    /// Opens the manager over `store`, rehydrating the index from any
    /// previously persisted tiles and dropping the ones already expired.
    pub fn new(store: S, clock: C, config: TileCacheConfig) -> Self {
        let mut manager = Self {
            cache: TileCache::new(config),
            store,
            clock,
            offline: false,
        };
        manager.rehydrate();
        manager
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Flips the offline flag. Offline requests never touch the network;
    /// a miss yields `TileResponse::Unavailable`.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn stats(&self) -> TileCacheStats {
        self.cache.stats()
    }

    /// Cached payload for `key`, or `None` on any kind of miss.
    pub fn get(&mut self, key: &TileKey) -> Option<Vec<u8>> {
        let now = self.clock.now_ms();
        match self.cache.touch(key, now) {
            TileLookup::Hit { .. } => match self.store.read(key) {
                Ok(Some(payload)) => Some(payload),
                Ok(None) => {
                    tracing::warn!(%key, "indexed tile has no stored payload, dropping");
                    self.cache.remove(key);
                    self.delete_stored(key);
                    None
                }
                Err(err) => {
                    // Drop the payload too, or unreadable files pile up
                    // in storage with no index entry pointing at them.
                    tracing::warn!(%key, error = %err, "tile read failed, treating as miss");
                    self.cache.remove(key);
                    self.delete_stored(key);
                    None
                }
            },
            TileLookup::Expired => {
                self.delete_stored(key);
                None
            }
            TileLookup::Absent => None,
        }
    }

    /// Stores a tile payload. `ttl_ms = None` applies the configured
    /// default TTL.
    pub fn put(&mut self, key: TileKey, payload: &[u8], ttl_ms: Option<u64>) -> PutOutcome {
        let now = self.clock.now_ms();
        let ttl_ms = ttl_ms.unwrap_or(self.cache.config().default_ttl_ms);
        let meta = StoredTileMeta {
            key: key.clone(),
            size_bytes: payload.len(),
            stored_at: now,
            ttl_ms,
        };

        // Storage first, bookkeeping second.
        if let Err(err) = self.store.write(&meta, payload) {
            tracing::warn!(%key, error = %err, "tile write failed, not caching");
            return PutOutcome::default();
        }

        match self.cache.insert(key.clone(), payload.len(), ttl_ms, now) {
            Ok(evicted) => {
                for evicted_key in &evicted {
                    self.delete_stored(evicted_key);
                }
                PutOutcome {
                    stored: true,
                    evicted,
                }
            }
            Err(err) => {
                tracing::warn!(%key, error = %err, "tile rejected by cache");
                self.delete_stored(&key);
                PutOutcome::default()
            }
        }
    }

    /// Serves `key` from the cache, falling back to `fetcher` when online.
    pub fn request(&mut self, key: &TileKey, fetcher: &mut impl TileFetcher) -> TileResponse {
        if let Some(payload) = self.get(key) {
            return TileResponse::Cached(payload);
        }
        if self.offline {
            return TileResponse::Unavailable;
        }
        match fetcher.fetch(key) {
            Ok(payload) => {
                self.put(key.clone(), &payload, None);
                TileResponse::Fetched(payload)
            }
            Err(err) => {
                tracing::debug!(%key, error = %err, "tile fetch failed");
                TileResponse::Unavailable
            }
        }
    }

    /// Eagerly purges expired tiles from index and storage. Returns how
    /// many were removed.
    pub fn cleanup_expired_tiles(&mut self) -> usize {
        let now = self.clock.now_ms();
        let expired = self.cache.cleanup_expired(now);
        for key in &expired {
            self.delete_stored(key);
        }
        expired.len()
    }

    /// Purges everything unconditionally.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
        if let Err(err) = self.store.clear() {
            tracing::warn!(error = %err, "tile store clear failed");
        }
    }

    fn rehydrate(&mut self) {
        let stored = match self.store.index() {
            Ok(stored) => stored,
            Err(err) => {
                tracing::warn!(error = %err, "tile index unreadable, starting cold");
                return;
            }
        };
        let now = self.clock.now_ms();
        for meta in stored {
            if now.since(meta.stored_at) > meta.ttl_ms {
                self.delete_stored(&meta.key);
                continue;
            }
            // Reusing the original stored_at keeps TTLs honest across
            // restarts. Eviction here is fine if capacity shrank.
            match self
                .cache
                .insert(meta.key.clone(), meta.size_bytes, meta.ttl_ms, meta.stored_at)
            {
                Ok(evicted) => {
                    for key in &evicted {
                        self.delete_stored(key);
                    }
                }
                Err(err) => {
                    tracing::warn!(key = %meta.key, error = %err, "stored tile no longer fits");
                    self.delete_stored(&meta.key);
                }
            }
        }
    }

    fn delete_stored(&mut self, key: &TileKey) {
        if let Err(err) = self.store.delete(key) {
            tracing::warn!(%key, error = %err, "tile delete failed");
        }
    }
}
