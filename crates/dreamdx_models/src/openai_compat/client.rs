//! Generic client for OpenAI-compatible APIs.

use crate::openai_compat::{ChatResponse, conversions};
use async_trait::async_trait;
use dreamdx_core::{GenerateRequest, GenerateResponse};
use dreamdx_error::{GenerationError, GenerationErrorKind};
use dreamdx_interface::NarrativeDriver;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, instrument};

/// OpenAI's chat completions endpoint.
pub const DEFAULT_CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generic client for any OpenAI-compatible API.
#[derive(Debug, Clone)]
pub struct OpenAICompatibleClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    provider_name: &'static str,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAICompatibleClient {
    /// Creates a new OpenAI-compatible client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - API key for authentication
    /// * `model` - Model identifier
    /// * `base_url` - Full URL of the chat completions endpoint
    /// * `provider_name` - Name of the provider (for logging/tracing)
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    #[instrument(skip(api_key), fields(provider = provider_name, model = %model))]
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        provider_name: &'static str,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GenerationError::new(GenerationErrorKind::Http(format!(
                "Failed to build HTTP client: {}",
                e
            )))
        })?;

        debug!(
            provider = provider_name,
            model = %model,
            url = %base_url,
            "Created OpenAI-compatible client"
        );

        Ok(Self {
            client,
            api_key,
            model,
            base_url,
            provider_name,
            max_tokens: None,
            temperature: None,
        })
    }

    /// Client for OpenAI itself with the default model.
    pub fn openai(api_key: String, timeout: Duration) -> Result<Self, GenerationError> {
        Self::new(
            api_key,
            DEFAULT_MODEL.to_string(),
            DEFAULT_CHAT_COMPLETIONS_URL.to_string(),
            "openai",
            timeout,
        )
    }

    /// Default `max_tokens` applied when a request sets none.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Default `temperature` applied when a request sets none.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Returns the endpoint URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, req), fields(provider = self.provider_name, model = %self.model))]
    async fn send(&self, req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let effective = apply_defaults(req, self.max_tokens, self.temperature);
        let chat_request = conversions::to_chat_request(&effective, &self.model)?;

        debug!(
            provider = self.provider_name,
            message_count = chat_request.messages().len(),
            "Sending request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.provider_name, error = ?e, "HTTP request failed");
                GenerationError::new(GenerationErrorKind::Http(format!("Request failed: {}", e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                provider = self.provider_name,
                status = %status,
                error = %error_text,
                "API error"
            );

            return Err(GenerationError::new(GenerationErrorKind::Api {
                status: status.as_u16(),
                message: error_text,
            }));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = self.provider_name, error = ?e, "Failed to parse response");
            GenerationError::new(GenerationErrorKind::ResponseParsing(format!(
                "Failed to parse JSON: {}",
                e
            )))
        })?;

        debug!(
            provider = self.provider_name,
            choices = chat_response.choices.len(),
            "Received response"
        );

        conversions::from_chat_response(&chat_response)
    }
}

/// Copy of `req` with unset sampling options filled from client defaults.
fn apply_defaults(
    req: &GenerateRequest,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
) -> GenerateRequest {
    let mut builder = GenerateRequest::builder();
    builder
        .messages(req.messages().clone())
        .model(req.model().clone())
        .max_tokens(req.max_tokens().or(max_tokens))
        .temperature(req.temperature().or(temperature));
    builder.build().unwrap_or_else(|_| req.clone())
}

#[async_trait]
impl NarrativeDriver for OpenAICompatibleClient {
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, GenerationError> {
        self.send(request).await
    }

    fn provider_name(&self) -> &'static str {
        self.provider_name
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
