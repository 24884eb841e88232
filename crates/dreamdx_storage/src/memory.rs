//! In-memory implementation of NarrativeStore.

use async_trait::async_trait;
use dreamdx_core::{NarrativeKey, NarrativeRecord};
use dreamdx_error::StorageError;
use dreamdx_interface::NarrativeStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// In-memory narrative store.
///
/// Stores records in a BTreeMap protected by an RwLock for thread-safe access.
/// All data is lost when the store is dropped. Clones share the same map.
///
/// # Example
/// ```
/// use dreamdx_storage::InMemoryNarrativeStore;
///
/// #[tokio::main]
/// async fn main() {
///     let store = InMemoryNarrativeStore::new();
///     assert!(store.is_empty().await);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryNarrativeStore {
    records: Arc<RwLock<BTreeMap<NarrativeKey, NarrativeRecord>>>,
}

impl InMemoryNarrativeStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records.
    pub fn with_records(records: impl IntoIterator<Item = NarrativeRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.key(), r)).collect();
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored records, deleted-flagged ones included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Check if the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Remove every record.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }
}

#[async_trait]
impl NarrativeStore for InMemoryNarrativeStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn get(&self, key: &NarrativeKey) -> Result<Option<NarrativeRecord>, StorageError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    #[instrument(skip(self, record), fields(key = %record.key()))]
    async fn put(&self, record: &NarrativeRecord) -> Result<(), StorageError> {
        let replaced = self
            .records
            .write()
            .await
            .insert(record.key(), record.clone())
            .is_some();
        debug!(replaced, entries = record.entries().len(), "Stored narrative");
        Ok(())
    }

    #[instrument(skip(self), fields(key = %key))]
    async fn delete(&self, key: &NarrativeKey) -> Result<bool, StorageError> {
        Ok(self.records.write().await.remove(key).is_some())
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
