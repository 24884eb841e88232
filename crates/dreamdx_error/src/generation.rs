//! Remote generation error types.

/// Failure modes of the remote text generator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Transport-level failure reaching the provider
    #[display("HTTP error: {}", _0)]
    Http(String),
    /// Provider answered with a non-success status
    #[display("API error (status {}): {}", status, message)]
    Api {
        /// HTTP status code
        status: u16,
        /// Error body returned by the provider
        message: String,
    },
    /// Provider body could not be decoded
    #[display("Response parsing failed: {}", _0)]
    ResponseParsing(String),
    /// Provider returned no usable text
    #[display("Provider returned an empty completion")]
    EmptyResponse,
    /// Request could not be assembled
    #[display("Builder error: {}", _0)]
    Builder(String),
}

/// Remote generation error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The specific failure
    pub kind: GenerationErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new generation error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
