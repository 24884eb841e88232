//! Narrative error types.

/// Specific error conditions for narrative operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum NarrativeErrorKind {
    /// An active narrative already exists for the key
    #[display("Narrative already exists for the given session ID. Please use a new dream name.")]
    DuplicateSession {
        /// Owner of the narrative
        user_id: String,
        /// Session the caller tried to start
        session_id: String,
    },
    /// No active narrative exists for the key
    #[display("Session not found.")]
    SessionNotFound {
        /// Owner of the narrative
        user_id: String,
        /// Session the caller referenced
        session_id: String,
    },
    /// Request was missing a field or carried an unusable value
    #[display("{}", _0)]
    MalformedRequest(String),
    /// Command string did not name a known operation
    #[display("Unknown command or missing arguments.")]
    UnknownCommand(String),
}

/// Error type for narrative operations.
///
/// # Examples
///
/// ```
/// use dreamdx_error::{NarrativeError, NarrativeErrorKind};
///
/// let err = NarrativeError::new(NarrativeErrorKind::SessionNotFound {
///     user_id: "alice".to_string(),
///     session_id: "dream1".to_string(),
/// });
/// assert!(format!("{}", err).contains("Session not found"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Narrative Error: {} at line {} in {}", kind, line, file)]
pub struct NarrativeError {
    /// The specific error condition
    pub kind: NarrativeErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl NarrativeError {
    /// Create a new NarrativeError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: NarrativeErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Shorthand for a malformed request.
    #[track_caller]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(NarrativeErrorKind::MalformedRequest(message.into()))
    }
}
