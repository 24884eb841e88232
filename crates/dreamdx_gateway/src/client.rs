//! Typed client of the narrative endpoint.

use crate::{AttemptError, RetryPolicy, parse_retry_after, retry_with_backoff};
use chrono::Utc;
use dreamdx_core::{Acknowledgement, DreamRequest, ErrorBody, NarrativeDocument};
use dreamdx_error::{GatewayError, GatewayErrorKind, GatewayResult};
use reqwest::{Client, StatusCode, header::RETRY_AFTER};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument};

/// HTTP client that posts dream commands to the narrative endpoint.
///
/// Each call is retried according to its [`RetryPolicy`]; connection
/// failures, timeouts and 500/502/503/504 are transient, anything else
/// fails at once. A timeout is only retried for idempotent commands: the
/// server may still be generating, and a repeated start or continue would
/// pay for a second generation.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: String,
    stage: String,
    policy: RetryPolicy,
}

impl GatewayClient {
    /// Create a client for `base_url` with routes under `/{stage}`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        stage: impl Into<String>,
        policy: RetryPolicy,
        timeout: Duration,
    ) -> GatewayResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            GatewayError::new(GatewayErrorKind::Request(format!(
                "Failed to build HTTP client: {}",
                e
            )))
        })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            stage: stage.into().trim_matches('/').to_string(),
            policy,
        })
    }

    /// Retry policy in use.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Full URL a request is posted to.
    pub fn url_for(&self, request: &DreamRequest) -> String {
        if self.stage.is_empty() {
            format!("{}/{}", self.base_url, request.command().endpoint())
        } else {
            format!(
                "{}/{}/{}",
                self.base_url,
                self.stage,
                request.command().endpoint()
            )
        }
    }

    /// Post a request and decode the answer.
    ///
    /// # Errors
    ///
    /// Returns the last failure once retries are exhausted, or the first
    /// non-retryable one.
    #[instrument(skip(self, request), fields(command = %request.command()))]
    pub async fn send<T: DeserializeOwned>(&self, request: &DreamRequest) -> GatewayResult<T> {
        let url = self.url_for(request);
        let url = url.as_str();
        let idempotent = request.command().is_idempotent();
        retry_with_backoff(&self.policy, move || async move {
            self.attempt(url, request).await.map_err(|failure| {
                if !idempotent && matches!(failure.error.kind, GatewayErrorKind::Timeout(_)) {
                    failure.fatal()
                } else {
                    failure
                }
            })
        })
        .await
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        request: &DreamRequest,
    ) -> Result<T, AttemptError> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| parse_retry_after(v, Utc::now()));
        let body = response.bytes().await.map_err(classify)?;
        debug!(status = %status, bytes = body.len(), "Received response");

        if status.is_success() {
            return serde_json::from_slice(&body).map_err(|e| {
                GatewayError::new(GatewayErrorKind::Decode(e.to_string())).into()
            });
        }

        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| reason(status));
        let kind = if status.is_client_error() {
            GatewayErrorKind::ClientStatus {
                status: status.as_u16(),
                message,
            }
        } else {
            GatewayErrorKind::ServerStatus {
                status: status.as_u16(),
                message,
            }
        };

        Err(AttemptError {
            retry_after,
            ..AttemptError::from(GatewayError::new(kind))
        })
    }

    /// Start a dream.
    pub async fn start_narrative(
        &self,
        user_id: &str,
        session_id: &str,
        dream_description: &str,
    ) -> GatewayResult<NarrativeDocument> {
        self.send(&DreamRequest::start(user_id, session_id, dream_description))
            .await
    }

    /// Add an action to a dream.
    pub async fn continue_narrative(
        &self,
        user_id: &str,
        session_id: &str,
        user_action: &str,
    ) -> GatewayResult<NarrativeDocument> {
        self.send(&DreamRequest::continue_narrative(
            user_id,
            session_id,
            user_action,
        ))
        .await
    }

    /// End a dream.
    pub async fn wake_up(&self) -> GatewayResult<Acknowledgement> {
        self.send(&DreamRequest::wake_up()).await
    }

    /// Active dreams of a user.
    pub async fn get_narratives(&self, user_id: &str) -> GatewayResult<Vec<NarrativeDocument>> {
        self.send(&DreamRequest::get_narratives(user_id)).await
    }

    /// Delete a dream.
    pub async fn delete_narrative(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> GatewayResult<Acknowledgement> {
        self.send(&DreamRequest::delete(user_id, session_id)).await
    }

    /// One dream with its full history.
    pub async fn get_narrative_content(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> GatewayResult<NarrativeDocument> {
        self.send(&DreamRequest::get_content(user_id, session_id))
            .await
    }
}

#[track_caller]
fn classify(e: reqwest::Error) -> AttemptError {
    let kind = if e.is_timeout() {
        GatewayErrorKind::Timeout(e.to_string())
    } else if e.is_connect() {
        GatewayErrorKind::Connection(e.to_string())
    } else {
        GatewayErrorKind::Request(e.to_string())
    };
    GatewayError::new(kind).into()
}

fn reason(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
