use crate::hub::BroadcastHub;
use crate::state::AgentState;
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state for history API
pub struct HistoryAppState {
    pub hub: Arc<BroadcastHub>,
    /// Used when the request omits `limit`
    pub default_limit: i64,
}

/// Query parameters for agent history
#[derive(Deserialize)]
pub struct HistoryParams {
    /// Max entries to return; zero or negative returns everything retained
    pub limit: Option<i64>,
}

/// History response, oldest entry first
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub agent_id: String,
    pub history: Vec<AgentState>,
}

/// Create history API router
pub fn create_history_router(state: Arc<HistoryAppState>) -> Router {
    Router::new()
        .route("/api/agents/:agent_id/history", get(get_agent_history))
        .with_state(state)
}

/// GET /api/agents/:agent_id/history?limit=N
///
/// Unknown agents return an empty history, not an error.
async fn get_agent_history(
    State(state): State<Arc<HistoryAppState>>,
    Path(agent_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Json<HistoryResponse> {
    let limit = params.limit.unwrap_or(state.default_limit);
    let history = state.hub.history(&agent_id, limit);

    Json(HistoryResponse { agent_id, history })
}
