//! Endpoint behaviour exercised through the axum router.

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, http::StatusCode};
use dreamdx_core::{GenerateRequest, GenerateResponse};
use dreamdx_error::{GenerationError, GenerationErrorKind};
use dreamdx_interface::NarrativeDriver;
use dreamdx_narrative::NarrativeService;
use dreamdx_server::{DreamConfig, build_store, create_router};
use dreamdx_storage::InMemoryNarrativeStore;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

/// Numbers its scenes; fails every call when `broken`.
#[derive(Default)]
struct CountingDriver {
    calls: AtomicUsize,
    broken: bool,
}

#[async_trait]
impl NarrativeDriver for CountingDriver {
    async fn generate(&self, _req: &GenerateRequest) -> Result<GenerateResponse, GenerationError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.broken {
            return Err(GenerationError::new(GenerationErrorKind::Http(
                "connection reset".to_string(),
            )));
        }
        Ok(GenerateResponse::new(format!("Scene {}", n), None))
    }

    fn provider_name(&self) -> &'static str {
        "counting"
    }

    fn model_name(&self) -> &str {
        "counting-v1"
    }
}

fn test_router(driver: CountingDriver) -> Router {
    let service = NarrativeService::new(Arc::new(driver), Arc::new(InMemoryNarrativeStore::new()));
    create_router(Arc::new(service), "dev")
}

async fn post(router: &Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(router: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post(router, uri, body.to_string()).await
}

#[tokio::test]
async fn test_health() {
    let router = test_router(CountingDriver::default());
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_start_continue_and_fetch() {
    let router = test_router(CountingDriver::default());

    let (status, started) = post_json(
        &router,
        "/dev/dream/start",
        json!({
            "command": "start dreaming",
            "user_id": "alice",
            "session_id": "dream1",
            "dream_description": "a forest"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["session_id"], "dream1");
    assert_eq!(started["actions"], json!([]));
    assert!(
        started["description"]
            .as_str()
            .unwrap()
            .starts_with("You open your eyes")
    );

    let (status, continued) = post_json(
        &router,
        "/dev/dream/continue",
        json!({
            "command": "Continue Narrative",
            "user_id": "alice",
            "session_id": "dream1",
            "user_action": "walk north"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(continued["actions"], json!(["walk north"]));
    assert_eq!(continued["descriptions"].as_array().unwrap().len(), 2);
    assert_eq!(continued["description"], "Scene 2");

    let (status, fetched) = post_json(
        &router,
        "/dev/narratives/get-content",
        json!({ "command": "get narrative content", "user_id": "alice", "session_id": "dream1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, continued);
}

#[tokio::test]
async fn test_duplicate_start_is_conflict() {
    let router = test_router(CountingDriver::default());
    let body = json!({
        "command": "start dreaming",
        "user_id": "alice",
        "session_id": "dream1",
        "dream_description": "a forest"
    });

    let (first, _) = post_json(&router, "/dev/dream/start", body.clone()).await;
    let (second, error) = post_json(&router, "/dev/dream/start", body).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::CONFLICT);
    assert_eq!(
        error["error"],
        "Narrative already exists for the given session ID. Please use a new dream name."
    );
}

#[tokio::test]
async fn test_continue_missing_session_is_not_found() {
    let router = test_router(CountingDriver::default());
    let (status, error) = post_json(
        &router,
        "/dev/dream/continue",
        json!({
            "command": "continue narrative",
            "user_id": "alice",
            "session_id": "ghost",
            "user_action": "look around"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error, json!({ "error": "Session not found." }));
}

#[tokio::test]
async fn test_bad_requests_are_400() {
    let router = test_router(CountingDriver::default());

    let (status, error) = post_json(&router, "/", json!({ "command": "fly away" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "Unknown command or missing arguments.");

    let (status, _) = post(&router, "/dev/dream/start", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        &router,
        "/dev/dream/start",
        json!({ "command": "start dreaming", "user_id": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_generation_failure_is_bad_gateway() {
    let router = test_router(CountingDriver {
        broken: true,
        ..CountingDriver::default()
    });
    let (status, error) = post_json(
        &router,
        "/dev/dream/start",
        json!({
            "command": "start dreaming",
            "user_id": "alice",
            "dream_description": "a forest"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error["error"].as_str().unwrap().contains("connection reset"));
}

#[tokio::test]
async fn test_proxy_envelope_on_root() {
    let router = test_router(CountingDriver::default());
    let inner = json!({
        "command": "start dreaming",
        "user_id": "alice",
        "dream_description": "a forest"
    });

    let (status, started) =
        post_json(&router, "/", json!({ "body": inner.to_string() })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["session_id"], "default_session");

    let (status, woke) = post_json(&router, "/dev/dream/wake-up", json!({ "command": "wake up" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(woke, json!({ "message": "You woke up." }));
}

#[tokio::test]
async fn test_list_and_delete() {
    let router = test_router(CountingDriver::default());
    for session in ["beta", "alpha"] {
        post_json(
            &router,
            "/dev/dream/start",
            json!({
                "command": "start dreaming",
                "user_id": "alice",
                "session_id": session,
                "dream_description": "seed"
            }),
        )
        .await;
    }

    let list = json!({ "command": "get narratives", "user_id": "alice" });
    let (_, listed) = post_json(&router, "/dev/narratives/get-narratives", list.clone()).await;
    let sessions: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["session_id"].as_str().unwrap())
        .collect();
    assert_eq!(sessions, vec!["alpha", "beta"]);

    let (status, ack) = post_json(
        &router,
        "/dev/narratives/delete",
        json!({ "command": "delete narrative", "user_id": "alice", "session_id": "alpha" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        ack["message"],
        "Successfully deleted narrative session alpha for user alice"
    );

    let (_, listed) = post_json(&router, "/dev/narratives/get-narratives", list).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("narratives.json");
    let config = DreamConfig::from_toml_str(&format!(
        "[storage]\nbackend = \"file\"\npath = '{}'",
        path.display()
    ))
    .unwrap();

    let service = NarrativeService::new(
        Arc::new(CountingDriver::default()),
        build_store(&config).await.unwrap(),
    );
    let router = create_router(Arc::new(service), "dev");
    let (status, _) = post_json(
        &router,
        "/dev/dream/start",
        json!({
            "command": "start dreaming",
            "user_id": "alice",
            "session_id": "dream1",
            "dream_description": "a forest"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(path.exists());

    let restarted = NarrativeService::new(
        Arc::new(CountingDriver::default()),
        build_store(&config).await.unwrap(),
    );
    let router = create_router(Arc::new(restarted), "dev");
    let (status, listed) = post_json(
        &router,
        "/dev/narratives/get-narratives",
        json!({ "command": "get narratives", "user_id": "alice" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["session_id"], "dream1");
}
