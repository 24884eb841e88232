//! DreamDX: interactive dream narratives generated by a hosted language model.
//!
//! The dreamer seeds a dream with a short description, then acts inside it
//! one line at a time; every turn is narrated by the model and kept as an
//! append-only story.
//!
//! This crate re-exports the workspace crates and adds [`DreamSession`], the
//! client-side state of an interactive dream.
//!
//! # Example
//!
//! ```no_run
//! use dreamdx::{GatewayClient, RetryPolicy};
//! use std::time::Duration;
//!
//! # async fn demo() -> Result<(), dreamdx::GatewayError> {
//! let client = GatewayClient::new(
//!     "http://localhost:8080",
//!     "dev",
//!     RetryPolicy::default(),
//!     Duration::from_secs(30),
//! )?;
//! let dream = client.start_narrative("alice", "dream1", "a forest").await?;
//! println!("{}", dream.description);
//! # Ok(())
//! # }
//! ```

mod session;

pub use dreamdx_core::*;
pub use dreamdx_error::*;
pub use dreamdx_gateway::{
    AttemptError, GatewayClient, RetryPolicy, parse_retry_after, retry_with_backoff,
};
pub use dreamdx_interface::{NarrativeDriver, NarrativeStore};
pub use dreamdx_models::{DEFAULT_CHAT_COMPLETIONS_URL, DEFAULT_MODEL, OpenAICompatibleClient};
pub use dreamdx_narrative::{
    CONTINUATION_PROMPT_TEMPLATE, DeleteMode, GenerationSettings, INITIAL_PROMPT_TEMPLATE,
    NarrativePrompts, NarrativeService, OPENING_PREFIX, WAKE_UP_MESSAGE,
};
pub use dreamdx_server::{
    DreamConfig, GatewaySettings, GeneratorSettings, LoggingSettings, ServerSettings,
    StorageBackend, StorageSettings, create_router,
};
pub use dreamdx_storage::{InMemoryNarrativeStore, JsonFileNarrativeStore};
pub use session::{DreamSession, describe_gateway_error, run_dream_loop};
