//! History entries.

use crate::Role;
use chrono::{DateTime, Utc};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// One immutable step of a narrative.
///
/// `sequence` is the position in the history and is the ordering key;
/// `timestamp` is the wall-clock time of the write that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Entry {
    /// Position in the history, starting at zero
    sequence: u64,
    /// Wall-clock capture at write time
    timestamp: DateTime<Utc>,
    /// `Assistant` for descriptions, `User` for actions
    role: Role,
    /// Description or action text
    text: String,
}

impl Entry {
    /// Creates an entry at the given position.
    pub fn new(sequence: u64, timestamp: DateTime<Utc>, role: Role, text: impl Into<String>) -> Self {
        Self {
            sequence,
            timestamp,
            role,
            text: text.into(),
        }
    }

    /// True for generated descriptions.
    pub fn is_description(&self) -> bool {
        self.role == Role::Assistant
    }

    /// True for user actions.
    pub fn is_action(&self) -> bool {
        self.role == Role::User
    }
}
