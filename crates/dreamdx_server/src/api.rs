//! HTTP routes of the narrative endpoint.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use dreamdx_core::{DreamRequest, ErrorBody, RequestContext};
use dreamdx_error::{DreamError, DreamErrorKind, NarrativeError, NarrativeErrorKind};
use dreamdx_narrative::NarrativeService;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

/// Command paths mounted under the stage prefix.
pub const COMMAND_PATHS: [&str; 6] = [
    "/dream/start",
    "/dream/continue",
    "/dream/wake-up",
    "/narratives/get-narratives",
    "/narratives/delete",
    "/narratives/get-content",
];

/// API server state.
#[derive(Clone)]
pub struct ApiState {
    /// The service every command route dispatches to.
    pub service: Arc<NarrativeService>,
}

/// Creates the API router.
///
/// Every command route, and `POST /`, accepts the same body and dispatches
/// on its `command` field.
pub fn create_router(service: Arc<NarrativeService>, stage: &str) -> Router {
    let state = ApiState { service };

    let commands = COMMAND_PATHS
        .iter()
        .fold(Router::new(), |router, path| {
            router.route(path, post(handle_command))
        });

    let stage = stage.trim_matches('/');
    let router = Router::new()
        .route("/", post(handle_command))
        .route("/health", get(health_check));
    let router = if stage.is_empty() {
        router.merge(commands)
    } else {
        router.nest(&format!("/{}", stage), commands)
    };

    router.with_state(state)
}

/// Health check endpoint.
#[instrument(skip_all)]
async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Parse, dispatch and render one command.
#[instrument(skip_all)]
async fn handle_command(State(state): State<ApiState>, body: Bytes) -> Response {
    let event: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!(error = %e, "Body is not JSON");
            return ApiError::from(DreamError::from(NarrativeError::malformed(
                "Request body must be a JSON object",
            )))
            .into_response();
        }
    };

    let command = match DreamRequest::from_event(event).and_then(DreamRequest::into_command) {
        Ok(command) => command,
        Err(e) => return ApiError::from(DreamError::from(e)).into_response(),
    };

    let ctx = RequestContext::for_command(&command);
    debug!(request_id = %ctx.request_id(), command = %command.command(), "Dispatching");

    match state.service.dispatch(&ctx, command).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// A service failure rendered as `{"error": ...}` with a matching status.
#[derive(Debug, derive_more::From)]
pub struct ApiError(DreamError);

/// HTTP status for an error.
pub fn status_for(err: &DreamError) -> StatusCode {
    match err.kind() {
        DreamErrorKind::Narrative(e) => match e.kind {
            NarrativeErrorKind::DuplicateSession { .. } => StatusCode::CONFLICT,
            NarrativeErrorKind::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            NarrativeErrorKind::MalformedRequest(_) | NarrativeErrorKind::UnknownCommand(_) => {
                StatusCode::BAD_REQUEST
            }
        },
        DreamErrorKind::Generation(_) | DreamErrorKind::Gateway(_) => StatusCode::BAD_GATEWAY,
        DreamErrorKind::Storage(_) | DreamErrorKind::Config(_) | DreamErrorKind::Server(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            error!(status = %status, error = %self.0, "Request failed");
        } else {
            warn!(status = %status, error = %self.0, "Request rejected");
        }
        (status, Json(ErrorBody::new(self.0.public_message()))).into_response()
    }
}
