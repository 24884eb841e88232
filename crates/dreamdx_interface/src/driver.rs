//! Remote text generator interface.

use async_trait::async_trait;
use dreamdx_core::{GenerateRequest, GenerateResponse};
use dreamdx_error::GenerationError;

/// A hosted text generator: prompt in, text out.
///
/// Implementations perform exactly one remote call per `generate` and do not
/// retry; a failure is returned to the caller as is.
#[async_trait]
pub trait NarrativeDriver: Send + Sync {
    /// Generate a completion for the request.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, GenerationError>;

    /// Provider name, used in logs.
    fn provider_name(&self) -> &'static str;

    /// Model identifier, used in logs.
    fn model_name(&self) -> &str;
}
