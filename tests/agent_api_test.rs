// Integration tests for the ingestion, history and query endpoints

use agent_monitor::api::{
    create_history_router, create_ingestion_router, create_query_router, AppState,
    HistoryAppState, QueryAppState,
};
use agent_monitor::BroadcastHub;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn create_test_app(hub: Arc<BroadcastHub>, body_size_limit: usize) -> Router {
    Router::new()
        .merge(create_ingestion_router(AppState {
            hub: Arc::clone(&hub),
            body_size_limit,
        }))
        .merge(create_history_router(Arc::new(HistoryAppState {
            hub: Arc::clone(&hub),
            default_limit: 20,
        })))
        .merge(create_query_router(Arc::new(QueryAppState { hub })))
}

fn post_state(agent_id: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/agents/{}/state", agent_id))
        .header("Content-Type", "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// ── ingestion ────────────────────────────────────────────────────────────────

/// POST a valid state → 200 {"success": true}, state visible in hub
#[tokio::test]
async fn test_ingest_returns_success() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);

    let (status, body) = send(&app, post_state("agent-1", r#"{"status":"idle"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true}));
    assert_eq!(hub.current("agent-1").unwrap().state["status"], "idle");
}

/// Ingestion succeeds with no observers connected
#[tokio::test]
async fn test_ingest_without_observers() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);

    let (status, _) = send(&app, post_state("agent-1", "{}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(hub.observer_count(), 0);
    assert_eq!(hub.metrics_snapshot().total_ingested, 1);
}

/// Non-object JSON → 400 with failure message, no state recorded
#[tokio::test]
async fn test_ingest_rejects_non_object() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);

    let (status, body) = send(&app, post_state("agent-1", "[1,2]")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "state must be a JSON object");
    assert!(hub.current("agent-1").is_none());
}

/// Broken JSON → 400
#[tokio::test]
async fn test_ingest_rejects_invalid_json() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 1_048_576);

    let (status, body) = send(&app, post_state("agent-1", "{status")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("invalid JSON"));
}

/// Body over the configured limit → 413
#[tokio::test]
async fn test_ingest_rejects_oversized_body() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 10);

    let (status, body) = send(&app, post_state("agent-1", r#"{"status":"running"}"#)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
}

/// A configured limit above axum's 2 MiB default is honoured
#[tokio::test]
async fn test_ingest_accepts_body_within_large_limit() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 8 * 1024 * 1024);
    let blob = "x".repeat(3 * 1024 * 1024);

    let (status, body) = send(
        &app,
        post_state("agent-1", json!({ "blob": blob }).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        hub.current("agent-1").unwrap().state["blob"].as_str().unwrap().len(),
        3 * 1024 * 1024
    );
}

/// A body far over the limit still gets a JSON rejection
#[tokio::test]
async fn test_ingest_rejects_large_body_with_json() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);
    let blob = "x".repeat(3 * 1024 * 1024);

    let (status, body) = send(
        &app,
        post_state("agent-1", json!({ "blob": blob }).to_string()),
    )
    .await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("limit"));
    assert!(hub.current("agent-1").is_none());
}

/// A malformed payload for one agent leaves other agents untouched
#[tokio::test]
async fn test_malformed_payload_isolated() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);

    send(&app, post_state("agent-2", r#"{"status":"idle"}"#)).await;
    send(&app, post_state("agent-1", "not json")).await;

    assert!(hub.current("agent-1").is_none());
    assert_eq!(hub.current("agent-2").unwrap().state["status"], "idle");
}

// ── history ──────────────────────────────────────────────────────────────────

/// Scenario: two agent-1 states and one agent-2 state
#[tokio::test]
async fn test_history_returns_states_in_ingestion_order() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 1_048_576);

    send(&app, post_state("agent-1", r#"{"status":"idle"}"#)).await;
    send(&app, post_state("agent-1", r#"{"status":"running"}"#)).await;
    send(&app, post_state("agent-2", r#"{"status":"idle"}"#)).await;

    let (status, body) = send(&app, get("/api/agents/agent-1/history?limit=20")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["agent_id"], "agent-1");
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["state"], json!({"status": "idle"}));
    assert_eq!(history[1]["state"], json!({"status": "running"}));
    assert!(history[0]["timestamp"].is_string());

    let (_, all) = send(&app, get("/api/agents")).await;
    assert_eq!(all["agent-1"]["state"], json!({"status": "running"}));
    assert_eq!(all["agent-2"]["state"], json!({"status": "idle"}));
}

/// limit defaults to 20, trims to the most recent, and <= 0 returns everything
#[tokio::test]
async fn test_history_limits() {
    let hub = Arc::new(BroadcastHub::new());
    let app = create_test_app(Arc::clone(&hub), 1_048_576);
    for i in 0..30 {
        send(&app, post_state("agent-1", format!(r#"{{"progress":{}}}"#, i))).await;
    }

    let (_, body) = send(&app, get("/api/agents/agent-1/history")).await;
    let history = body["history"].as_array().unwrap();
    assert_eq!(history.len(), 20);
    assert_eq!(history[0]["state"]["progress"], 10);
    assert_eq!(history[19]["state"]["progress"], 29);

    let (_, body) = send(&app, get("/api/agents/agent-1/history?limit=3")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 3);

    let (_, body) = send(&app, get("/api/agents/agent-1/history?limit=0")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 30);

    let (_, body) = send(&app, get("/api/agents/agent-1/history?limit=-1")).await;
    assert_eq!(body["history"].as_array().unwrap().len(), 30);
}

/// Unknown agent → empty history, not an error
#[tokio::test]
async fn test_history_unknown_agent_is_empty() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 1_048_576);

    let (status, body) = send(&app, get("/api/agents/ghost/history")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"agent_id": "ghost", "history": []}));
}

// ── query ────────────────────────────────────────────────────────────────────

/// GET /api/agents/:id → current state, 404 when unknown
#[tokio::test]
async fn test_get_current_agent() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 1_048_576);
    send(&app, post_state("agent-1", r#"{"status":"idle","phase":"warmup"}"#)).await;

    let (status, body) = send(&app, get("/api/agents/agent-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"]["phase"], "warmup");

    let (status, body) = send(&app, get("/api/agents/ghost")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "agent not found: ghost");
}

/// GET /api/metrics reflects ingestion counters
#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_test_app(Arc::new(BroadcastHub::new()), 1_048_576);
    send(&app, post_state("agent-1", "{}")).await;
    send(&app, post_state("agent-2", "{}")).await;

    let (status, body) = send(&app, get("/api/metrics")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_ingested"], 2);
    assert_eq!(body["known_agents"], 2);
    assert_eq!(body["connected_observers"], 0);
}
