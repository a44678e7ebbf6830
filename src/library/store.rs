//! Keyed object store for library records.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("library store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("library store has unreadable contents: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A library record as handed to the store, before it has a key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackRecord {
    pub path: PathBuf,
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
}

/// A library record with its store-assigned key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTrack {
    pub id: u64,
    #[serde(flatten)]
    pub record: TrackRecord,
}

/// The external keyed object store the library is persisted in.
///
/// Keys are auto-generated. The player only ever adds records and loads
/// them all at startup; there is no update or delete path.
pub trait LibraryStore {
    fn add(&mut self, record: TrackRecord) -> Result<u64, StoreError>;
    fn get_all(&self) -> Result<Vec<StoredTrack>, StoreError>;
}

/// JSON-file implementation of [`LibraryStore`] with auto-incremented keys.
pub struct JsonFileStore {
    path: PathBuf,
    records: Vec<StoredTrack>,
    next_id: u64,
}

impl JsonFileStore {
    /// Open (or create) the store file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records: Vec<StoredTrack> = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        let next_id = records.iter().map(|r| r.id + 1).max().unwrap_or(1);
        debug!(records = records.len(), path = %path.display(), "opened library store");
        Ok(Self {
            path,
            records,
            next_id,
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&self.records)?;
        fs::write(&self.path, bytes)?;
        Ok(())
    }
}

impl LibraryStore for JsonFileStore {
    fn add(&mut self, record: TrackRecord) -> Result<u64, StoreError> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(StoredTrack { id, record });
        self.persist()?;
        Ok(id)
    }

    fn get_all(&self) -> Result<Vec<StoredTrack>, StoreError> {
        Ok(self.records.clone())
    }
}

/// In-memory store used by tests and as a fallback when the data directory
/// is unavailable.
pub struct MemoryStore {
    records: Vec<StoredTrack>,
    next_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryStore for MemoryStore {
    fn add(&mut self, record: TrackRecord) -> Result<u64, StoreError> {
        let id = self.next_id;
        self.next_id += 1;
        self.records.push(StoredTrack { id, record });
        Ok(id)
    }

    fn get_all(&self) -> Result<Vec<StoredTrack>, StoreError> {
        Ok(self.records.clone())
    }
}

/// Default on-disk location of the library store.
pub fn default_store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("library.json")
}
