//! Narrative persistence interface.

use async_trait::async_trait;
use dreamdx_core::{NarrativeKey, NarrativeRecord};
use dreamdx_error::StorageError;

/// Key-value store of narrative records keyed by (user, session).
///
/// `put` overwrites whatever is stored under the record's key. Stores return
/// deleted-flagged records like any other; filtering is the caller's job.
#[async_trait]
pub trait NarrativeStore: Send + Sync {
    /// Fetch the record stored under `key`.
    async fn get(&self, key: &NarrativeKey) -> Result<Option<NarrativeRecord>, StorageError>;

    /// Write a record under its own key.
    async fn put(&self, record: &NarrativeRecord) -> Result<(), StorageError>;

    /// Remove the record under `key`. Returns whether anything was removed.
    async fn delete(&self, key: &NarrativeKey) -> Result<bool, StorageError>;

    /// All records of a user, ordered by session id.
    async fn list(&self, user_id: &str) -> Result<Vec<NarrativeRecord>, StorageError>;
}
