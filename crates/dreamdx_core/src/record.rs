//! Narrative records and their wire document.

use crate::{Entry, Role};
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use dreamdx_error::{StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};

/// Format of the `date` field on the wire.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Store key of a narrative: one session of one user.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, derive_more::Display,
)]
#[display("{}/{}", user_id, session_id)]
pub struct NarrativeKey {
    /// Owner of the narrative (the login email)
    pub user_id: String,
    /// User-chosen dream name
    pub session_id: String,
}

impl NarrativeKey {
    /// Creates a key.
    pub fn new(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// A stored narrative.
///
/// History is append-only: [`NarrativeRecord::append_turn`] adds entries and
/// never rewrites existing ones.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use dreamdx_core::{NarrativeKey, NarrativeRecord};
///
/// let key = NarrativeKey::new("alice", "dream1");
/// let mut record = NarrativeRecord::begin(&key, "prompt", "A forest.", Utc::now());
/// record.append_turn("walk north", "prompt 2", "A river.", Utc::now());
///
/// assert_eq!(record.descriptions(), vec!["A forest.", "A river."]);
/// assert_eq!(record.actions(), vec!["walk north"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct NarrativeRecord {
    /// Owner of the narrative
    user_id: String,
    /// Dream name
    session_id: String,
    /// When the narrative was started
    created_at: DateTime<Utc>,
    /// Time of the last write
    updated_at: DateTime<Utc>,
    /// Last prompt sent to the generator
    prompt: String,
    /// History in sequence order
    entries: Vec<Entry>,
    /// Soft-delete flag
    #[getter(skip)]
    is_deleted: bool,
}

impl NarrativeRecord {
    /// Starts a narrative with its opening description as entry 0.
    pub fn begin(
        key: &NarrativeKey,
        prompt: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: key.user_id.clone(),
            session_id: key.session_id.clone(),
            created_at: now,
            updated_at: now,
            prompt: prompt.into(),
            entries: vec![Entry::new(0, now, Role::Assistant, description)],
            is_deleted: false,
        }
    }

    /// Appends the dreamer's action followed by the generated response.
    pub fn append_turn(
        &mut self,
        action: impl Into<String>,
        prompt: impl Into<String>,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        let next = self.next_sequence();
        self.entries.push(Entry::new(next, now, Role::User, action));
        self.entries
            .push(Entry::new(next + 1, now, Role::Assistant, description));
        self.prompt = prompt.into();
        self.updated_at = now;
    }

    /// Sets the soft-delete flag.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = now;
    }

    /// Store key of this record.
    pub fn key(&self) -> NarrativeKey {
        NarrativeKey::new(&self.user_id, &self.session_id)
    }

    /// Whether the soft-delete flag is set.
    pub fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Whether the record counts as a live narrative.
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Generated descriptions in call order.
    pub fn descriptions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.is_description())
            .map(|e| e.text().as_str())
            .collect()
    }

    /// Dreamer actions in call order.
    pub fn actions(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.is_action())
            .map(|e| e.text().as_str())
            .collect()
    }

    /// Most recent description.
    pub fn latest_description(&self) -> &str {
        self.entries
            .iter()
            .rev()
            .find(|e| e.is_description())
            .map(|e| e.text().as_str())
            .unwrap_or_default()
    }

    fn next_sequence(&self) -> u64 {
        self.entries
            .last()
            .map(|e| e.sequence() + 1)
            .unwrap_or_default()
    }
}

/// JSON shape of a narrative as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeDocument {
    /// Owner of the narrative
    pub user_id: String,
    /// Dream name
    pub session_id: String,
    /// Unix seconds of the last write
    pub timestamp: i64,
    /// Creation date, `YYYY-MM-DD`
    pub date: String,
    /// Last prompt sent to the generator
    pub prompt: String,
    /// Most recent description
    pub description: String,
    /// All descriptions in call order
    #[serde(default)]
    pub descriptions: Vec<String>,
    /// All actions in call order
    #[serde(default)]
    pub actions: Vec<String>,
    /// Full history
    #[serde(default)]
    pub entries: Vec<Entry>,
    /// Soft-delete flag
    #[serde(default)]
    pub is_deleted: bool,
}

impl From<&NarrativeRecord> for NarrativeDocument {
    fn from(record: &NarrativeRecord) -> Self {
        Self {
            user_id: record.user_id.clone(),
            session_id: record.session_id.clone(),
            timestamp: record.updated_at.timestamp(),
            date: record.created_at.format(DATE_FORMAT).to_string(),
            prompt: record.prompt.clone(),
            description: record.latest_description().to_string(),
            descriptions: record.descriptions().into_iter().map(String::from).collect(),
            actions: record.actions().into_iter().map(String::from).collect(),
            entries: record.entries.clone(),
            is_deleted: record.is_deleted,
        }
    }
}

impl From<NarrativeRecord> for NarrativeDocument {
    fn from(record: NarrativeRecord) -> Self {
        Self::from(&record)
    }
}

/// Rebuilds a record from its stored document.
///
/// The history in `entries` is authoritative. The creation time comes from
/// the first entry; `timestamp` supplies the last-write time when it is
/// later than the final entry (a soft delete writes no entry).
impl TryFrom<NarrativeDocument> for NarrativeRecord {
    type Error = StorageError;

    fn try_from(document: NarrativeDocument) -> Result<Self, Self::Error> {
        let (Some(first), Some(last)) = (document.entries.first(), document.entries.last()) else {
            return Err(StorageError::new(StorageErrorKind::Serialization(format!(
                "Narrative {}/{} has no entries",
                document.user_id, document.session_id
            ))));
        };

        if document
            .entries
            .windows(2)
            .any(|pair| pair[1].sequence() <= pair[0].sequence())
        {
            return Err(StorageError::new(StorageErrorKind::Serialization(format!(
                "Narrative {}/{} has out-of-order entries",
                document.user_id, document.session_id
            ))));
        }

        let created_at = *first.timestamp();
        let updated_at = if last.timestamp().timestamp() >= document.timestamp {
            *last.timestamp()
        } else {
            DateTime::from_timestamp(document.timestamp, 0).ok_or_else(|| {
                StorageError::new(StorageErrorKind::Serialization(format!(
                    "Narrative {}/{} has an invalid timestamp {}",
                    document.user_id, document.session_id, document.timestamp
                )))
            })?
        };

        Ok(Self {
            user_id: document.user_id,
            session_id: document.session_id,
            created_at,
            updated_at,
            prompt: document.prompt,
            entries: document.entries,
            is_deleted: document.is_deleted,
        })
    }
}
