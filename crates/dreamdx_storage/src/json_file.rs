//! File-backed implementation of NarrativeStore.

use async_trait::async_trait;
use dreamdx_core::{NarrativeDocument, NarrativeKey, NarrativeRecord};
use dreamdx_error::{StorageError, StorageErrorKind};
use dreamdx_interface::NarrativeStore;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

/// Narrative store persisted as a single JSON document.
///
/// Each record is written in its [`NarrativeDocument`] shape, so the file
/// carries `timestamp`, `date`, `description` and `actions` alongside the
/// full entry history.
///
/// The whole table is kept in memory and rewritten on every mutation. Writes
/// go to a sibling temporary file which is then renamed over the original,
/// so a crash never leaves a half-written table behind.
#[derive(Debug, Clone)]
pub struct JsonFileNarrativeStore {
    path: PathBuf,
    records: Arc<RwLock<BTreeMap<NarrativeKey, NarrativeRecord>>>,
}

impl JsonFileNarrativeStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::Io(format!(
                    "Failed to create {}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        let records = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => {
                let documents: Vec<NarrativeDocument> =
                    serde_json::from_slice(&bytes).map_err(|e| {
                        StorageError::new(StorageErrorKind::Serialization(format!(
                            "Failed to parse {}: {}",
                            path.display(),
                            e
                        )))
                    })?;
                documents
                    .into_iter()
                    .map(|document| NarrativeRecord::try_from(document).map(|r| (r.key(), r)))
                    .collect::<Result<BTreeMap<_, _>, _>>()?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(StorageError::new(StorageErrorKind::Io(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    e
                ))));
            }
        };

        info!(records = records.len(), "Opened narrative file");

        Ok(Self {
            path,
            records: Arc::new(RwLock::new(records)),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, records: &BTreeMap<NarrativeKey, NarrativeRecord>) -> Result<(), StorageError> {
        let list: Vec<NarrativeDocument> = records.values().map(NarrativeDocument::from).collect();
        let bytes = serde_json::to_vec_pretty(&list).map_err(|e| {
            StorageError::new(StorageErrorKind::Serialization(format!(
                "Failed to encode narratives: {}",
                e
            )))
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Io(format!(
                "Failed to write {}: {}",
                tmp.display(),
                e
            )))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::Io(format!(
                "Failed to replace {}: {}",
                self.path.display(),
                e
            )))
        })?;

        debug!(records = list.len(), bytes = bytes.len(), "Persisted narratives");
        Ok(())
    }
}

#[async_trait]
impl NarrativeStore for JsonFileNarrativeStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &NarrativeKey) -> Result<Option<NarrativeRecord>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    #[instrument(skip(self, record), fields(key = %record.key()))]
    async fn put(&self, record: &NarrativeRecord) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        let previous = records.insert(record.key(), record.clone());

        if let Err(e) = self.persist(&records).await {
            // Keep memory consistent with disk.
            match previous {
                Some(old) => records.insert(record.key(), old),
                None => records.remove(&record.key()),
            };
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &NarrativeKey) -> Result<bool, StorageError> {
        let mut records = self.records.write().await;
        let Some(removed) = records.remove(key) else {
            return Ok(false);
        };

        if let Err(e) = self.persist(&records).await {
            records.insert(key.clone(), removed);
            return Err(e);
        }
        Ok(true)
    }

    #[instrument(skip(self))]
    async fn list(&self, user_id: &str) -> Result<Vec<NarrativeRecord>, StorageError> {
        Ok(self
            .records
            .read()
            .await
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }
}
