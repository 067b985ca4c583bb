use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque agent payload: string keys to arbitrary JSON values.
///
/// The monitor never interprets or mutates these contents.
pub type StatePayload = Map<String, Value>;

/// Immutable, timestamped snapshot of an agent's state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    /// Payload as reported by the agent
    pub state: StatePayload,

    /// Ingestion time, assigned by the hub
    pub timestamp: DateTime<Utc>,
}

impl AgentState {
    pub fn new(state: StatePayload, timestamp: DateTime<Utc>) -> Self {
        Self { state, timestamp }
    }
}
