//! Generation-scoped response cache.
//!
//! Entries live under a generation tag; bumping the tag and deleting the
//! old generations is how stale shell assets get evicted wholesale.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::Response;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache entry has unreadable metadata: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// The response cache the gateway strategies read and write.
pub trait CacheStore: Send + Sync {
    fn get(&self, generation: &str, key: &str) -> Result<Option<Response>, CacheError>;
    fn put(&self, generation: &str, key: &str, response: &Response) -> Result<(), CacheError>;
    fn generations(&self) -> Result<Vec<String>, CacheError>;
    fn delete_generation(&self, generation: &str) -> Result<(), CacheError>;
}

#[derive(Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    content_type: Option<String>,
}

/// On-disk implementation: one directory per generation, and per entry a
/// JSON metadata sidecar next to the raw body.
///
/// Writers are serialized and files land via rename, so concurrent puts
/// on one key resolve to whole entries, last writer wins.
pub struct DiskStore {
    root: PathBuf,
    put_lock: Mutex<()>,
}

impl DiskStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            put_lock: Mutex::new(()),
        })
    }

    fn meta_path(&self, generation: &str, key: &str) -> PathBuf {
        self.root.join(generation).join(format!("{key}.json"))
    }

    fn body_path(&self, generation: &str, key: &str) -> PathBuf {
        self.root.join(generation).join(format!("{key}.bin"))
    }
}

impl CacheStore for DiskStore {
    fn get(&self, generation: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let meta_bytes = match fs::read(self.meta_path(generation, key)) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: EntryMeta = serde_json::from_slice(&meta_bytes)?;
        let body = fs::read(self.body_path(generation, key))?;
        Ok(Some(Response {
            status: meta.status,
            content_type: meta.content_type,
            body: Bytes::from(body),
            opaque: false,
        }))
    }

    fn put(&self, generation: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        let dir = self.root.join(generation);
        fs::create_dir_all(&dir)?;
        let meta = EntryMeta {
            status: response.status,
            content_type: response.content_type.clone(),
        };

        // Concurrent revalidations can race on the same key. Each file
        // goes through a temp name and an atomic rename, and the two
        // renames of an entry never interleave with another writer's.
        let _guard = self.put_lock.lock().unwrap();
        let body_tmp = dir.join(format!("{key}.bin.tmp"));
        fs::write(&body_tmp, &response.body)?;
        fs::rename(&body_tmp, self.body_path(generation, key))?;
        let meta_tmp = dir.join(format!("{key}.json.tmp"));
        fs::write(&meta_tmp, serde_json::to_vec(&meta)?)?;
        fs::rename(&meta_tmp, self.meta_path(generation, key))?;
        debug!(generation, key, "cached response");
        Ok(())
    }

    fn generations(&self) -> Result<Vec<String>, CacheError> {
        let mut tags = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    tags.push(name.to_string());
                }
            }
        }
        tags.sort();
        Ok(tags)
    }

    fn delete_generation(&self, generation: &str) -> Result<(), CacheError> {
        match fs::remove_dir_all(self.root.join(generation)) {
            Ok(()) => {
                debug!(generation, "deleted cache generation");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory cache, used by tests and as the fallback when no cache
/// directory is writable.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), Response>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, generation: &str, key: &str) -> Result<Option<Response>, CacheError> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(&(generation.to_string(), key.to_string()))
            .cloned())
    }

    fn put(&self, generation: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert((generation.to_string(), key.to_string()), response.clone());
        Ok(())
    }

    fn generations(&self) -> Result<Vec<String>, CacheError> {
        let entries = self.entries.lock().unwrap();
        let mut tags: Vec<String> = entries.keys().map(|(g, _)| g.clone()).collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    fn delete_generation(&self, generation: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(g, _), _| g != generation);
        Ok(())
    }
}
