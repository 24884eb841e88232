//! Response bodies of the narrative endpoint.

use crate::NarrativeDocument;
use serde::{Deserialize, Serialize};

/// Plain acknowledgement such as `{"message": "You woke up."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Human-readable confirmation
    pub message: String,
}

impl Acknowledgement {
    /// Creates an acknowledgement.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error body: `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable failure description
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Successful result of a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(untagged)]
pub enum DreamReply {
    /// A single narrative
    Narrative(NarrativeDocument),
    /// Every active narrative of a user
    Narratives(Vec<NarrativeDocument>),
    /// A plain acknowledgement
    Message(Acknowledgement),
}
