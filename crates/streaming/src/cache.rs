use std::collections::BTreeMap;

use foundation::time::TimestampMs;

use crate::tile::TileKey;

/// Tile cache tuning knobs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileCacheConfig {
    /// Total payload byte budget.
    pub capacity_bytes: usize,
    /// TTL applied when the caller does not pass one explicitly.
    pub default_ttl_ms: u64,
}

impl Default for TileCacheConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: 32 * 1024 * 1024,
            default_ttl_ms: 7 * 24 * 60 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TileMeta {
    size_bytes: usize,
    stored_at: TimestampMs,
    ttl_ms: u64,
    last_used_tick: u64,
}

impl TileMeta {
    fn is_expired(&self, now: TimestampMs) -> bool {
        now.since(self.stored_at) > self.ttl_ms
    }
}

/// Outcome of a cache index lookup.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TileLookup {
    /// Entry present and fresh; carries the payload size.
    Hit { size_bytes: usize },
    /// Entry was present but past its TTL and has been dropped.
    Expired,
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileCacheError {
    TooLarge { requested: usize, capacity: usize },
}

impl std::fmt::Display for TileCacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileCacheError::TooLarge {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "tile too large for cache: requested={requested} capacity={capacity}"
                )
            }
        }
    }
}

impl std::error::Error for TileCacheError {}

/// Aggregate cache state for the host's offline indicator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct TileCacheStats {
    pub total_tiles: usize,
    pub total_size_bytes: usize,
    pub oldest_stored_at: Option<TimestampMs>,
}

/// Deterministic in-memory tile index with TTL expiry and an LRU byte
/// budget. Payload bytes live in the persistent store; this tracks
/// bookkeeping only.
///
/// Notes on determinism:
/// - Entries are keyed in a `BTreeMap` for stable traversal order.
/// - Eviction is LRU by `last_used_tick`, with a tie-break by key
///   ordering.
/// - Expiry is lazy on `touch` and eager via `cleanup_expired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileCache {
    config: TileCacheConfig,
    used_bytes: usize,
    tick: u64,
    entries: BTreeMap<TileKey, TileMeta>,
}

impl TileCache {
    pub fn new(config: TileCacheConfig) -> Self {
        Self {
            config,
            used_bytes: 0,
            tick: 0,
            entries: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> TileCacheConfig {
        self.config
    }

    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &TileKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Looks up `key`, refreshing its LRU position on a hit.
    ///
    /// An expired entry is removed and reported as `Expired`; the caller
    /// treats both `Expired` and `Absent` as misses.
    pub fn touch(&mut self, key: &TileKey, now: TimestampMs) -> TileLookup {
        self.tick += 1;
        let Some(meta) = self.entries.get_mut(key) else {
            return TileLookup::Absent;
        };
        if meta.is_expired(now) {
            let size = meta.size_bytes;
            self.entries.remove(key);
            self.used_bytes = self.used_bytes.saturating_sub(size);
            return TileLookup::Expired;
        }
        meta.last_used_tick = self.tick;
        TileLookup::Hit {
            size_bytes: meta.size_bytes,
        }
    }

    /// Records a stored tile, evicting least-recently-used entries until
    /// the new one fits. Returns the evicted keys so the caller can drop
    /// their payloads from persistent storage.
    ///
    /// Re-inserting an existing key refreshes `stored_at` and its size.
    pub fn insert(
        &mut self,
        key: TileKey,
        size_bytes: usize,
        ttl_ms: u64,
        now: TimestampMs,
    ) -> Result<Vec<TileKey>, TileCacheError> {
        if size_bytes > self.config.capacity_bytes {
            return Err(TileCacheError::TooLarge {
                requested: size_bytes,
                capacity: self.config.capacity_bytes,
            });
        }

        self.tick += 1;
        if let Some(previous) = self.entries.insert(
            key.clone(),
            TileMeta {
                size_bytes,
                stored_at: now,
                ttl_ms,
                last_used_tick: self.tick,
            },
        ) {
            self.used_bytes = self.used_bytes.saturating_sub(previous.size_bytes);
        }
        self.used_bytes += size_bytes;

        Ok(self.evict_as_needed(&key))
    }

    /// Removes `key` from the index. Returns its size if it was present.
    pub fn remove(&mut self, key: &TileKey) -> Option<usize> {
        let meta = self.entries.remove(key)?;
        self.used_bytes = self.used_bytes.saturating_sub(meta.size_bytes);
        Some(meta.size_bytes)
    }

    /// Drops every entry past its TTL, returning the removed keys in
    /// ascending key order.
    pub fn cleanup_expired(&mut self, now: TimestampMs) -> Vec<TileKey> {
        let expired: Vec<TileKey> = self
            .entries
            .iter()
            .filter(|(_, meta)| meta.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.remove(key);
        }
        expired
    }

    /// Drops everything unconditionally, returning the removed keys.
    pub fn clear(&mut self) -> Vec<TileKey> {
        self.used_bytes = 0;
        let entries = std::mem::take(&mut self.entries);
        entries.into_keys().collect()
    }

    pub fn stats(&self) -> TileCacheStats {
        TileCacheStats {
            total_tiles: self.entries.len(),
            total_size_bytes: self.used_bytes,
            oldest_stored_at: self.entries.values().map(|m| m.stored_at).min(),
        }
    }

    fn evict_as_needed(&mut self, protected: &TileKey) -> Vec<TileKey> {
        let mut evicted = Vec::new();
        while self.used_bytes > self.config.capacity_bytes {
            let candidate = self
                .entries
                .iter()
                .filter(|(key, _)| *key != protected)
                .min_by(|(ka, ma), (kb, mb)| {
                    ma.last_used_tick
                        .cmp(&mb.last_used_tick)
                        .then_with(|| ka.cmp(kb))
                })
                .map(|(key, _)| key.clone());

            // The protected key alone can never exceed capacity; insert
            // rejects oversized payloads up front.
            let Some(key) = candidate else {
                break;
            };
            self.remove(&key);
            evicted.push(key);
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::{TileCache, TileCacheConfig, TileCacheError, TileLookup};
    use crate::tile::TileKey;
    use foundation::time::TimestampMs;
    use pretty_assertions::assert_eq;

    fn config(capacity: usize) -> TileCacheConfig {
        TileCacheConfig {
            capacity_bytes: capacity,
            default_ttl_ms: 1_000,
        }
    }

    fn key(n: u32) -> TileKey {
        TileKey::new(4, n, 0, "streets")
    }

    const T0: TimestampMs = TimestampMs(0);

    #[test]
    fn capacity_is_never_exceeded() {
        let mut cache = TileCache::new(config(10));
        for n in 0..6 {
            cache.insert(key(n), 3, 1_000, T0).unwrap();
            assert!(cache.used_bytes() <= 10);
        }
        assert_eq!(cache.stats().total_size_bytes, 9);
    }

    #[test]
    fn eviction_is_lru_and_touch_refreshes_recency() {
        let mut cache = TileCache::new(config(9));
        cache.insert(key(1), 3, 1_000, T0).unwrap();
        cache.insert(key(2), 3, 1_000, T0).unwrap();
        cache.insert(key(3), 3, 1_000, T0).unwrap();

        // Touch the oldest so key(2) becomes least recently used.
        assert!(matches!(
            cache.touch(&key(1), T0),
            TileLookup::Hit { size_bytes: 3 }
        ));

        let evicted = cache.insert(key(4), 3, 1_000, T0).unwrap();
        assert_eq!(evicted, vec![key(2)]);
        assert!(cache.contains(&key(1)));
    }

    #[test]
    fn inserting_eleven_tiles_into_a_ten_tile_budget_drops_the_lru_one() {
        let mut cache = TileCache::new(config(10));
        for n in 0..11 {
            cache.insert(key(n), 1, 1_000, T0).unwrap();
        }
        assert_eq!(cache.stats().total_tiles, 10);
        assert!(!cache.contains(&key(0)));
        assert!(cache.contains(&key(10)));
    }

    #[test]
    fn expired_entries_read_as_misses_and_are_removed() {
        let mut cache = TileCache::new(config(100));
        cache.insert(key(1), 4, 1_000, T0).unwrap();

        assert!(matches!(
            cache.touch(&key(1), TimestampMs(1_000)),
            TileLookup::Hit { .. }
        ));
        assert_eq!(cache.touch(&key(1), TimestampMs(1_500)), TileLookup::Expired);
        assert_eq!(cache.touch(&key(1), TimestampMs(1_500)), TileLookup::Absent);
        assert_eq!(cache.stats().total_tiles, 0);
        assert_eq!(cache.used_bytes(), 0);
    }

    #[test]
    fn cleanup_purges_only_expired_entries() {
        let mut cache = TileCache::new(config(100));
        cache.insert(key(1), 1, 100, T0).unwrap();
        cache.insert(key(2), 1, 10_000, T0).unwrap();
        cache.insert(key(3), 1, 100, T0).unwrap();

        let removed = cache.cleanup_expired(TimestampMs(500));
        assert_eq!(removed, vec![key(1), key(3)]);
        assert_eq!(cache.stats().total_tiles, 1);
    }

    #[test]
    fn reinsert_refreshes_stored_at_and_size() {
        let mut cache = TileCache::new(config(100));
        cache.insert(key(1), 4, 1_000, T0).unwrap();
        cache.insert(key(1), 6, 1_000, TimestampMs(900)).unwrap();

        assert_eq!(cache.used_bytes(), 6);
        // Fresh stored_at: still alive at t=1500.
        assert!(matches!(
            cache.touch(&key(1), TimestampMs(1_500)),
            TileLookup::Hit { size_bytes: 6 }
        ));
    }

    #[test]
    fn oversized_payloads_are_rejected() {
        let mut cache = TileCache::new(config(10));
        let err = cache.insert(key(1), 11, 1_000, T0).unwrap_err();
        assert_eq!(
            err,
            TileCacheError::TooLarge {
                requested: 11,
                capacity: 10
            }
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_returns_all_keys() {
        let mut cache = TileCache::new(config(100));
        cache.insert(key(2), 1, 1_000, T0).unwrap();
        cache.insert(key(1), 1, 1_000, T0).unwrap();
        assert_eq!(cache.clear(), vec![key(1), key(2)]);
        assert_eq!(cache.stats(), super::TileCacheStats::default());
    }

    #[test]
    fn stats_report_oldest_tile() {
        let mut cache = TileCache::new(config(100));
        cache.insert(key(1), 1, 10_000, TimestampMs(50)).unwrap();
        cache.insert(key(2), 1, 10_000, TimestampMs(20)).unwrap();
        assert_eq!(cache.stats().oldest_stored_at, Some(TimestampMs(20)));
    }
}
