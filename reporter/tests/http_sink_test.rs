// Integration tests for pushing state to the monitor over HTTP

use agent_reporter::{ChangeDetectingReporter, HttpStateSink, ReporterConfig, StateSink};
use mockito::{Matcher, Server};
use serde_json::json;

fn payload(value: serde_json::Value) -> agent_reporter::StatePayload {
    value.as_object().cloned().unwrap()
}

fn config_for(server: &Server) -> ReporterConfig {
    ReporterConfig::with_service_url(format!("{}/api/agents", server.url()))
}

/// Successful push posts the JSON state to the agent's state path
#[tokio::test]
async fn test_http_sink_posts_state() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/agents/agent-1/state")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"status": "running", "progress": 5})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true}"#)
        .create_async()
        .await;

    let sink = HttpStateSink::new(&config_for(&server)).unwrap();
    sink.deliver("agent-1", &payload(json!({"status": "running", "progress": 5})))
        .await
        .unwrap();

    mock.assert_async().await;
}

/// Non-2xx responses surface as delivery errors from the sink
#[tokio::test]
async fn test_http_sink_reports_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/agents/agent-1/state")
        .with_status(500)
        .with_body(r#"{"success":false,"error":"boom"}"#)
        .create_async()
        .await;

    let sink = HttpStateSink::new(&config_for(&server)).unwrap();
    let err = sink
        .deliver("agent-1", &payload(json!({"status": "idle"})))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("500"));
}

/// Only meaningful changes reach the server
#[tokio::test]
async fn test_reporter_pushes_only_changes() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/agents/agent-1/state")
        .with_status(200)
        .with_body(r#"{"success":true}"#)
        .expect(2)
        .create_async()
        .await;

    let mut reporter = ChangeDetectingReporter::http("agent-1", &config_for(&server)).unwrap();
    reporter
        .log_state(payload(json!({"status": "idle"})), false)
        .await;
    reporter
        .log_state(payload(json!({"status": "idle", "heartbeat": 1})), false)
        .await;
    reporter
        .log_state(payload(json!({"status": "running"})), false)
        .await;

    mock.assert_async().await;
    assert_eq!(reporter.history().len(), 3);
}

/// A server failure never reaches the agent's control flow
#[tokio::test]
async fn test_reporter_swallows_server_failure() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/agents/agent-1/state")
        .with_status(503)
        .create_async()
        .await;

    let mut reporter = ChangeDetectingReporter::http("agent-1", &config_for(&server)).unwrap();
    let attempted = reporter
        .log_state(payload(json!({"status": "idle"})), false)
        .await;

    assert!(attempted);
    assert!(reporter.last_reported_state().is_some());
}
