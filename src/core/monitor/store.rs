use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::record::Record;
use crate::core::error::PersistError;
use crate::platform::{NativePlatform, Platform};

/// Backing storage for the watch-list: whole-list load and save.
#[async_trait]
pub trait EntryPersistence: Send + Sync {
    async fn load(&self) -> Result<Vec<Record>, PersistError>;
    async fn save(&self, records: &[Record]) -> Result<(), PersistError>;
}

/// Pretty-printed JSON array on disk, replaced atomically on every save.
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl EntryPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<Vec<Record>, PersistError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn save(&self, records: &[Record]) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut json = serde_json::to_string_pretty(records)?;
        json.push('\n');

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
        drop(file);
        NativePlatform::restrict_file_permissions(&tmp);
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// The watch-list. Every operation is a full read-modify-write of the backing
/// list, serialized by an async mutex.
pub struct RecordStore {
    backend: Arc<dyn EntryPersistence>,
    guard: Mutex<()>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn EntryPersistence>) -> Self {
        Self {
            backend,
            guard: Mutex::new(()),
        }
    }

    /// Never fails: a missing or unreadable backing store reads as empty.
    pub async fn load(&self) -> Vec<Record> {
        let _guard = self.guard.lock().await;
        self.load_locked().await
    }

    pub async fn save(&self, records: &[Record]) -> Result<(), PersistError> {
        let _guard = self.guard.lock().await;
        self.backend.save(records).await
    }

    /// Returns `false` when the record is already tracked; nothing is written
    /// in that case.
    pub async fn add(&self, record: Record) -> Result<bool, PersistError> {
        let _guard = self.guard.lock().await;
        let mut records = self.load_locked().await;
        if records.contains(&record) {
            return Ok(false);
        }
        info!("Tracking {}", record);
        records.push(record);
        self.backend.save(&records).await?;
        Ok(true)
    }

    /// Returns `false` when no such record was tracked.
    pub async fn remove(&self, record: &Record) -> Result<bool, PersistError> {
        let _guard = self.guard.lock().await;
        let mut records = self.load_locked().await;
        let Some(pos) = records.iter().position(|r| r == record) else {
            return Ok(false);
        };
        records.remove(pos);
        self.backend.save(&records).await?;
        info!("Stopped tracking {}", record);
        Ok(true)
    }

    async fn load_locked(&self) -> Vec<Record> {
        match self.backend.load().await {
            Ok(records) => unique(records),
            Err(e) => {
                warn!("Could not read tracked entries, treating as empty: {}", e);
                Vec::new()
            }
        }
    }
}

/// Drops repeated triples from a hand-edited file, keeping first occurrences.
fn unique(records: Vec<Record>) -> Vec<Record> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.clone()))
        .collect()
}
