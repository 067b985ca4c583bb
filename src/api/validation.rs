use crate::state::StatePayload;
use serde_json::Value;
use std::fmt;

/// Longest accepted agent identifier, in bytes
pub const MAX_AGENT_ID_LEN: usize = 256;

/// Validation errors for ingestion requests
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptyAgentId,
    AgentIdTooLong(usize),
    PayloadTooLarge { size: usize, limit: usize },
    InvalidJson(String),
    PayloadNotObject,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyAgentId => write!(f, "agent id is required"),
            ValidationError::AgentIdTooLong(len) => {
                write!(
                    f,
                    "agent id is {} bytes, maximum is {}",
                    len, MAX_AGENT_ID_LEN
                )
            }
            ValidationError::PayloadTooLarge { size, limit } => {
                write!(f, "payload is {} bytes, limit is {}", size, limit)
            }
            ValidationError::InvalidJson(e) => write!(f, "invalid JSON: {}", e),
            ValidationError::PayloadNotObject => write!(f, "state must be a JSON object"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validates an agent id and decodes the request body into a state payload.
///
/// Rules:
/// - Agent id: non-empty, at most `MAX_AGENT_ID_LEN` bytes
/// - Body: at most `limit` bytes, valid JSON, a JSON object
pub fn validate_ingest(
    agent_id: &str,
    body: &[u8],
    limit: usize,
) -> Result<StatePayload, ValidationError> {
    if agent_id.trim().is_empty() {
        return Err(ValidationError::EmptyAgentId);
    }
    if agent_id.len() > MAX_AGENT_ID_LEN {
        return Err(ValidationError::AgentIdTooLong(agent_id.len()));
    }
    if body.len() > limit {
        return Err(ValidationError::PayloadTooLarge {
            size: body.len(),
            limit,
        });
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ValidationError::PayloadNotObject),
        Err(e) => Err(ValidationError::InvalidJson(e.to_string())),
    }
}
