//! Error types for the DreamDX narrative service.
//!
//! Every error struct records the source location where it was created and
//! wraps a kind enum describing the failure. [`DreamError`] aggregates them.

mod config;
mod gateway;
mod generation;
mod narrative;
mod server;
mod storage;

pub use config::ConfigError;
pub use gateway::{GatewayError, GatewayErrorKind, GatewayResult};
pub use generation::{GenerationError, GenerationErrorKind};
pub use narrative::{NarrativeError, NarrativeErrorKind};
pub use server::{ServerError, ServerErrorKind};
pub use storage::{StorageError, StorageErrorKind};

/// Crate-level error variants.
#[derive(Debug, derive_more::From, derive_more::Display)]
pub enum DreamErrorKind {
    /// Narrative state violation or bad request
    #[display("{}", _0)]
    Narrative(NarrativeError),
    /// Remote generation failed
    #[display("{}", _0)]
    Generation(GenerationError),
    /// Narrative store failed
    #[display("{}", _0)]
    Storage(StorageError),
    /// Gateway client failed
    #[display("{}", _0)]
    Gateway(GatewayError),
    /// Configuration error
    #[display("{}", _0)]
    Config(ConfigError),
    /// HTTP server error
    #[display("{}", _0)]
    Server(ServerError),
}

/// DreamDX error with kind discrimination.
#[derive(Debug, derive_more::Display)]
#[display("DreamDX Error: {}", _0)]
pub struct DreamError(Box<DreamErrorKind>);

impl DreamError {
    /// Create a new error from a kind.
    pub fn new(kind: DreamErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DreamErrorKind {
        &self.0
    }

    /// Message suitable for showing to the person dreaming.
    ///
    /// Omits source locations and wraps infrastructure failures in a short
    /// explanation.
    ///
    /// # Examples
    ///
    /// ```
    /// use dreamdx_error::{DreamError, NarrativeError, NarrativeErrorKind};
    ///
    /// let err: DreamError = NarrativeError::new(NarrativeErrorKind::UnknownCommand(
    ///     "fly".to_string(),
    /// ))
    /// .into();
    /// assert_eq!(err.public_message(), "Unknown command or missing arguments.");
    /// ```
    pub fn public_message(&self) -> String {
        match self.kind() {
            DreamErrorKind::Narrative(e) => e.kind.to_string(),
            DreamErrorKind::Generation(e) => format!("Failed to generate narrative: {}", e.kind),
            DreamErrorKind::Storage(e) => format!("Failed to access narratives: {}", e.kind),
            DreamErrorKind::Gateway(e) => e.kind.to_string(),
            DreamErrorKind::Config(e) => e.message.clone(),
            DreamErrorKind::Server(e) => e.kind.to_string(),
        }
    }
}

impl std::error::Error for DreamError {}

// Generic From implementation for any type that converts to DreamErrorKind
impl<T> From<T> for DreamError
where
    T: Into<DreamErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for DreamDX operations.
pub type DreamResult<T> = std::result::Result<T, DreamError>;
