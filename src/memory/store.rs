//! Preference store backends.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::trace;
use uuid::Uuid;

use super::{MemoryError, PreferenceEntry, PreferenceStore};

/// JSON array on disk, oldest entry first.
///
/// Every append rewrites the whole (small) array through a temp file and a
/// rename, so readers in other processes never see a half-written log. Appends
/// within the process are serialised by a mutex.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    capacity: usize,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store at `path` keeping at most `capacity` entries.
    ///
    /// The file is created lazily on the first append.
    pub fn new(path: PathBuf, capacity: usize) -> Self {
        Self {
            path,
            capacity: capacity.max(1),
            lock: Mutex::new(()),
        }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<PreferenceEntry>, MemoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(|e| MemoryError::Corrupt(e.to_string()))
    }

    async fn persist(&self, entries: &[PreferenceEntry]) -> Result<(), MemoryError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| MemoryError::Serialize(e.to_string()))?;
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir).await?;
        let tmp_path = dir.join(format!(".preferences.{}.tmp", Uuid::new_v4()));
        tokio::fs::write(&tmp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for JsonFileStore {
    async fn append(&self, entry: PreferenceEntry) -> Result<(), MemoryError> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await?;
        entries.push(entry);
        let excess = entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            entries.drain(..excess);
        }
        self.persist(&entries).await?;
        trace!(count = entries.len(), path = %self.path.display(), "preferences persisted");
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<PreferenceEntry>, MemoryError> {
        let _guard = self.lock.lock().await;
        let entries = self.load().await?;
        Ok(entries.into_iter().rev().take(n).collect())
    }
}

/// Process-local store for tests and dry runs.
#[derive(Debug)]
pub struct InMemoryStore {
    entries: Mutex<VecDeque<PreferenceEntry>>,
    capacity: usize,
}

impl InMemoryStore {
    /// Create an empty store keeping at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }
}

#[async_trait]
impl PreferenceStore for InMemoryStore {
    async fn append(&self, entry: PreferenceEntry) -> Result<(), MemoryError> {
        let mut entries = self.entries.lock().await;
        entries.push_back(entry);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
        Ok(())
    }

    async fn read_recent(&self, n: usize) -> Result<Vec<PreferenceEntry>, MemoryError> {
        let entries = self.entries.lock().await;
        Ok(entries.iter().rev().take(n).cloned().collect())
    }
}
