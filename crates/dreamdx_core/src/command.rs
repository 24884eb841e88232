//! Commands accepted by the narrative endpoint.

use crate::NarrativeKey;
use derive_getters::Getters;
use dreamdx_error::{NarrativeError, NarrativeErrorKind};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;

/// Session used when a request omits `session_id`.
pub const DEFAULT_SESSION_ID: &str = "default_session";

/// Command names understood by the endpoint, matched case-insensitively.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum Command {
    /// Begin a new narrative
    #[strum(serialize = "start dreaming")]
    StartDreaming,
    /// Add an action and narrate the result
    #[strum(serialize = "continue narrative")]
    ContinueNarrative,
    /// End the dream client-side
    #[strum(serialize = "wake up")]
    WakeUp,
    /// List a user's narratives
    #[strum(serialize = "get narratives")]
    GetNarratives,
    /// Delete one narrative
    #[strum(serialize = "delete narrative")]
    DeleteNarrative,
    /// Fetch one narrative
    #[strum(serialize = "get narrative content")]
    GetNarrativeContent,
}

impl Command {
    /// Route under the stage prefix that the gateway posts this command to.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Command::StartDreaming => "dream/start",
            Command::ContinueNarrative => "dream/continue",
            Command::WakeUp => "dream/wake-up",
            Command::GetNarratives => "narratives/get-narratives",
            Command::DeleteNarrative => "narratives/delete",
            Command::GetNarrativeContent => "narratives/get-content",
        }
    }

    /// Whether repeating the command after an unanswered attempt is harmless.
    ///
    /// Start and continue each trigger a generation, and a repeated delete
    /// turns a success into a 404.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self,
            Command::WakeUp | Command::GetNarratives | Command::GetNarrativeContent
        )
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Command::from_str(raw.trim()).map_err(serde::de::Error::custom)
    }
}

/// JSON body posted to the narrative endpoint.
///
/// # Examples
///
/// ```
/// use dreamdx_core::{Command, DreamRequest};
///
/// let request = DreamRequest::start("alice", "dream1", "a forest");
/// let body = serde_json::to_value(&request).unwrap();
/// assert_eq!(body["command"], "start dreaming");
/// assert_eq!(body["dream_description"], "a forest");
/// assert!(body.get("user_action").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct DreamRequest {
    /// Operation to perform
    command: Command,
    /// Owner of the narrative
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    /// Dream name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    /// Seed text for `start dreaming`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dream_description: Option<String>,
    /// Action text for `continue narrative`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_action: Option<String>,
}

impl DreamRequest {
    fn bare(command: Command) -> Self {
        Self {
            command,
            user_id: None,
            session_id: None,
            dream_description: None,
            user_action: None,
        }
    }

    fn keyed(command: Command, user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            session_id: Some(session_id.into()),
            ..Self::bare(command)
        }
    }

    /// `start dreaming` payload.
    pub fn start(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        dream_description: impl Into<String>,
    ) -> Self {
        Self {
            dream_description: Some(dream_description.into()),
            ..Self::keyed(Command::StartDreaming, user_id, session_id)
        }
    }

    /// `continue narrative` payload.
    pub fn continue_narrative(
        user_id: impl Into<String>,
        session_id: impl Into<String>,
        user_action: impl Into<String>,
    ) -> Self {
        Self {
            user_action: Some(user_action.into()),
            ..Self::keyed(Command::ContinueNarrative, user_id, session_id)
        }
    }

    /// `wake up` payload.
    pub fn wake_up() -> Self {
        Self::bare(Command::WakeUp)
    }

    /// `get narratives` payload.
    pub fn get_narratives(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ..Self::bare(Command::GetNarratives)
        }
    }

    /// `delete narrative` payload.
    pub fn delete(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::keyed(Command::DeleteNarrative, user_id, session_id)
    }

    /// `get narrative content` payload.
    pub fn get_content(user_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self::keyed(Command::GetNarrativeContent, user_id, session_id)
    }

    /// Parses an incoming event.
    ///
    /// Accepts either the bare JSON body or an API-Gateway proxy envelope
    /// whose `body` field holds the JSON as a string. An envelope body that is
    /// not valid JSON is treated as an empty object.
    ///
    /// # Errors
    ///
    /// Returns `UnknownCommand` when `command` is missing or unrecognised.
    pub fn from_event(event: Value) -> Result<Self, NarrativeError> {
        let unwrapped = match event.get("body") {
            Some(Value::String(raw)) => Some(
                serde_json::from_str::<Value>(raw)
                    .ok()
                    .filter(Value::is_object)
                    .unwrap_or_else(|| Value::Object(Default::default())),
            ),
            Some(inner @ Value::Object(_)) => Some(inner.clone()),
            _ => None,
        };
        let body = unwrapped.unwrap_or(event);

        let field = |name: &str| {
            body.get(name)
                .and_then(Value::as_str)
                .map(|s| s.to_string())
        };

        let raw_command = field("command").unwrap_or_default();
        let command = Command::from_str(raw_command.trim())
            .map_err(|_| NarrativeError::new(NarrativeErrorKind::UnknownCommand(raw_command)))?;

        Ok(Self {
            command,
            user_id: field("user_id"),
            session_id: field("session_id"),
            dream_description: field("dream_description"),
            user_action: field("user_action"),
        })
    }

    /// Converts the request into a typed command.
    ///
    /// A missing `session_id` becomes [`DEFAULT_SESSION_ID`].
    ///
    /// # Errors
    ///
    /// Returns `MalformedRequest` when a field the command needs is absent.
    pub fn into_command(self) -> Result<DreamCommand, NarrativeError> {
        if self.command == Command::WakeUp {
            return Ok(DreamCommand::WakeUp);
        }

        let user_id = self
            .user_id
            .ok_or_else(|| NarrativeError::malformed("user_id is required"))?;
        let key = NarrativeKey::new(
            user_id.clone(),
            self.session_id
                .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string()),
        );

        Ok(match self.command {
            Command::StartDreaming => DreamCommand::Start {
                key,
                seed: self.dream_description.ok_or_else(|| {
                    NarrativeError::malformed("dream_description is required to start dreaming")
                })?,
            },
            Command::ContinueNarrative => DreamCommand::Continue {
                key,
                action: self.user_action.ok_or_else(|| {
                    NarrativeError::malformed("user_action is required to continue a narrative")
                })?,
            },
            Command::GetNarratives => DreamCommand::List { user_id },
            Command::DeleteNarrative => DreamCommand::Delete { key },
            Command::GetNarrativeContent => DreamCommand::GetContent { key },
            Command::WakeUp => DreamCommand::WakeUp,
        })
    }
}

/// A validated operation on the narrative service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DreamCommand {
    /// Start a narrative from seed text
    Start {
        /// Narrative to create
        key: NarrativeKey,
        /// Dream description
        seed: String,
    },
    /// Continue a narrative with an action
    Continue {
        /// Narrative to extend
        key: NarrativeKey,
        /// Action text
        action: String,
    },
    /// Acknowledge the end of a dream
    WakeUp,
    /// List active narratives
    List {
        /// Owner whose narratives are listed
        user_id: String,
    },
    /// Delete a narrative
    Delete {
        /// Narrative to delete
        key: NarrativeKey,
    },
    /// Fetch one narrative
    GetContent {
        /// Narrative to fetch
        key: NarrativeKey,
    },
}

impl DreamCommand {
    /// Wire command this operation corresponds to.
    pub fn command(&self) -> Command {
        match self {
            DreamCommand::Start { .. } => Command::StartDreaming,
            DreamCommand::Continue { .. } => Command::ContinueNarrative,
            DreamCommand::WakeUp => Command::WakeUp,
            DreamCommand::List { .. } => Command::GetNarratives,
            DreamCommand::Delete { .. } => Command::DeleteNarrative,
            DreamCommand::GetContent { .. } => Command::GetNarrativeContent,
        }
    }

    /// Narrative key, when the command targets one session.
    pub fn key(&self) -> Option<&NarrativeKey> {
        match self {
            DreamCommand::Start { key, .. }
            | DreamCommand::Continue { key, .. }
            | DreamCommand::Delete { key }
            | DreamCommand::GetContent { key } => Some(key),
            DreamCommand::WakeUp | DreamCommand::List { .. } => None,
        }
    }

    /// User the command acts for.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            DreamCommand::List { user_id } => Some(user_id),
            other => other.key().map(|k| k.user_id.as_str()),
        }
    }
}
