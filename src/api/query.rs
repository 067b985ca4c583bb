use crate::hub::{BroadcastHub, MetricsSnapshot};
use crate::state::AgentState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Shared state for query API
pub struct QueryAppState {
    pub hub: Arc<BroadcastHub>,
}

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create query API router
pub fn create_query_router(state: Arc<QueryAppState>) -> Router {
    Router::new()
        .route("/api/agents", get(list_agents))
        .route("/api/agents/:agent_id", get(get_agent))
        .route("/api/metrics", get(get_metrics))
        .with_state(state)
}

/// GET /api/agents - Latest state of every agent, keyed by agent id
async fn list_agents(State(state): State<Arc<QueryAppState>>) -> Json<HashMap<String, AgentState>> {
    Json(state.hub.all_current())
}

/// GET /api/agents/:agent_id - Latest state of one agent
async fn get_agent(
    State(state): State<Arc<QueryAppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<AgentState>, QueryError> {
    state
        .hub
        .current(&agent_id)
        .map(Json)
        .ok_or(QueryError::AgentNotFound(agent_id))
}

/// GET /api/metrics - Hub counters
async fn get_metrics(State(state): State<Arc<QueryAppState>>) -> Json<MetricsSnapshot> {
    Json(state.hub.metrics_snapshot())
}

/// Query error types
enum QueryError {
    AgentNotFound(String),
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            QueryError::AgentNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("agent not found: {}", id))
            }
        };
        (status, Json(ErrorResponse { error: error_message })).into_response()
    }
}
