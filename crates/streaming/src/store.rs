use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use foundation::time::TimestampMs;
use serde::{Deserialize, Serialize};

use crate::tile::TileKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileStoreError {
    Io(String),
    Corrupt(String),
}

impl std::fmt::Display for TileStoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileStoreError::Io(msg) => write!(f, "tile storage error: {msg}"),
            TileStoreError::Corrupt(msg) => write!(f, "tile storage corrupt: {msg}"),
        }
    }
}

impl std::error::Error for TileStoreError {}

/// Metadata persisted alongside a tile payload, so a restarted host can
/// rehydrate its cache index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTileMeta {
    pub key: TileKey,
    pub size_bytes: usize,
    pub stored_at: TimestampMs,
    pub ttl_ms: u64,
}

/// Persistent payload storage behind the in-memory cache index.
///
/// Implementations are synchronous; callers complete the `write` before
/// updating any bookkeeping so stats never undercount stored tiles.
pub trait TileStore {
    fn read(&self, key: &TileKey) -> Result<Option<Vec<u8>>, TileStoreError>;
    fn write(&mut self, meta: &StoredTileMeta, payload: &[u8]) -> Result<(), TileStoreError>;
    fn delete(&mut self, key: &TileKey) -> Result<bool, TileStoreError>;
    fn clear(&mut self) -> Result<(), TileStoreError>;
    /// All stored tiles, in ascending key order.
    fn index(&self) -> Result<Vec<StoredTileMeta>, TileStoreError>;
}

/// Volatile store for tests and hosts without persistence.
#[derive(Debug, Default)]
pub struct InMemoryTileStore {
    entries: BTreeMap<TileKey, (StoredTileMeta, Vec<u8>)>,
}

impl InMemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TileStore for InMemoryTileStore {
    fn read(&self, key: &TileKey) -> Result<Option<Vec<u8>>, TileStoreError> {
        Ok(self.entries.get(key).map(|(_, payload)| payload.clone()))
    }

    fn write(&mut self, meta: &StoredTileMeta, payload: &[u8]) -> Result<(), TileStoreError> {
        self.entries
            .insert(meta.key.clone(), (meta.clone(), payload.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &TileKey) -> Result<bool, TileStoreError> {
        Ok(self.entries.remove(key).is_some())
    }

    fn clear(&mut self) -> Result<(), TileStoreError> {
        self.entries.clear();
        Ok(())
    }

    fn index(&self) -> Result<Vec<StoredTileMeta>, TileStoreError> {
        Ok(self.entries.values().map(|(meta, _)| meta.clone()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexRecord {
    z: u8,
    x: u32,
    y: u32,
    style: String,
    size_bytes: usize,
    stored_at_ms: u64,
    ttl_ms: u64,
}

impl IndexRecord {
    fn from_meta(meta: &StoredTileMeta) -> Self {
        Self {
            z: meta.key.z,
            x: meta.key.x,
            y: meta.key.y,
            style: meta.key.style.clone(),
            size_bytes: meta.size_bytes,
            stored_at_ms: meta.stored_at.0,
            ttl_ms: meta.ttl_ms,
        }
    }

    fn into_meta(self) -> StoredTileMeta {
        StoredTileMeta {
            key: TileKey::new(self.z, self.x, self.y, self.style),
            size_bytes: self.size_bytes,
            stored_at: TimestampMs(self.stored_at_ms),
            ttl_ms: self.ttl_ms,
        }
    }
}

/// Filesystem store: one payload file per tile plus a JSON index sidecar.
///
/// The sidecar is rewritten on every mutation; tile counts here are in the
/// hundreds, not millions, so simplicity wins over incremental updates.
#[derive(Debug)]
pub struct FsTileStore {
    dir: PathBuf,
    index: BTreeMap<TileKey, StoredTileMeta>,
}

impl FsTileStore {
    const INDEX_FILE: &'static str = "index.json";

    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// A corrupt index sidecar degrades to an empty store rather than
    /// failing the open; orphaned payload files are ignored.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, TileStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| TileStoreError::Io(e.to_string()))?;

        let index = match Self::load_index(&dir) {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(error = %err, dir = %dir.display(), "tile index unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Ok(Self { dir, index })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load_index(dir: &Path) -> Result<BTreeMap<TileKey, StoredTileMeta>, TileStoreError> {
        let path = dir.join(Self::INDEX_FILE);
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = fs::read_to_string(&path).map_err(|e| TileStoreError::Io(e.to_string()))?;
        let records: Vec<IndexRecord> =
            serde_json::from_str(&raw).map_err(|e| TileStoreError::Corrupt(e.to_string()))?;
        Ok(records
            .into_iter()
            .map(IndexRecord::into_meta)
            .map(|meta| (meta.key.clone(), meta))
            .collect())
    }

    fn persist_index(&self) -> Result<(), TileStoreError> {
        let records: Vec<IndexRecord> = self.index.values().map(IndexRecord::from_meta).collect();
        let raw =
            serde_json::to_string(&records).map_err(|e| TileStoreError::Io(e.to_string()))?;
        fs::write(self.dir.join(Self::INDEX_FILE), raw)
            .map_err(|e| TileStoreError::Io(e.to_string()))
    }

    fn payload_path(&self, key: &TileKey) -> PathBuf {
        self.dir.join(format!("{}.tile", key.stem()))
    }
}

impl TileStore for FsTileStore {
    fn read(&self, key: &TileKey) -> Result<Option<Vec<u8>>, TileStoreError> {
        if !self.index.contains_key(key) {
            return Ok(None);
        }
        match fs::read(self.payload_path(key)) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TileStoreError::Io(e.to_string())),
        }
    }

    fn write(&mut self, meta: &StoredTileMeta, payload: &[u8]) -> Result<(), TileStoreError> {
        fs::write(self.payload_path(&meta.key), payload)
            .map_err(|e| TileStoreError::Io(e.to_string()))?;
        self.index.insert(meta.key.clone(), meta.clone());
        self.persist_index()
    }

    fn delete(&mut self, key: &TileKey) -> Result<bool, TileStoreError> {
        let was_present = self.index.remove(key).is_some();
        match fs::remove_file(self.payload_path(key)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(TileStoreError::Io(e.to_string())),
        }
        if was_present {
            self.persist_index()?;
        }
        Ok(was_present)
    }

    fn clear(&mut self) -> Result<(), TileStoreError> {
        let keys: Vec<TileKey> = self.index.keys().cloned().collect();
        for key in keys {
            self.delete(&key)?;
        }
        Ok(())
    }

    fn index(&self) -> Result<Vec<StoredTileMeta>, TileStoreError> {
        Ok(self.index.values().cloned().collect())
    }
}
