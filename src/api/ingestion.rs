use crate::api::validation::{validate_ingest, ValidationError};
use crate::hub::BroadcastHub;
use axum::{
    body::Body,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Shared application state for the ingestion endpoint
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<BroadcastHub>,
    pub body_size_limit: usize,
}

/// Response for `POST /api/agents/:agent_id/state`
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// Create API router with ingestion endpoint
pub fn create_ingestion_router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents/:agent_id/state", post(update_agent_state))
        .with_state(Arc::new(state))
}

/// POST /api/agents/:agent_id/state - Record an agent's state
///
/// Succeeds once the state is in the store, regardless of how many observers
/// received the fan-out. The body is read under `body_size_limit` only, so
/// every rejection answers with an `IngestResponse`.
async fn update_agent_state(
    State(state): State<Arc<AppState>>,
    Path(agent_id): Path<String>,
    body: Body,
) -> Result<Json<IngestResponse>, AppError> {
    let body = axum::body::to_bytes(body, state.body_size_limit)
        .await
        .map_err(|e| {
            warn!(agent_id = %agent_id, error = %e, "Rejected agent state body");
            AppError::from_body_error(e, state.body_size_limit)
        })?;

    let payload = validate_ingest(&agent_id, &body, state.body_size_limit).map_err(|e| {
        warn!(agent_id = %agent_id, error = %e, "Rejected agent state");
        AppError::from(e)
    })?;

    debug!(agent_id = %agent_id, fields = payload.len(), "Ingesting agent state");

    state.hub.ingest(&agent_id, payload).await;

    Ok(Json(IngestResponse {
        success: true,
        error: None,
    }))
}

/// Application error types
enum AppError {
    ValidationError(String),
    PayloadTooLarge(String),
}

impl AppError {
    fn from_body_error(e: axum::Error, limit: usize) -> Self {
        let source = e.into_inner();
        if source.downcast_ref::<LengthLimitError>().is_some() {
            AppError::PayloadTooLarge(format!("payload exceeds limit of {} bytes", limit))
        } else {
            AppError::ValidationError(format!("failed to read body: {}", source))
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        match e {
            ValidationError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(e.to_string()),
            other => AppError::ValidationError(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };
        let body = Json(IngestResponse {
            success: false,
            error: Some(error_message),
        });
        (status, body).into_response()
    }
}
