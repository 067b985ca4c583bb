use crate::observer::OutboundFrame;
use crate::state::AgentState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server → Client messages, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Latest state of every known agent, sent once right after joining
    #[serde(rename = "full_state")]
    FullState { data: HashMap<String, AgentState> },

    /// One agent's newly ingested state
    #[serde(rename = "state_update")]
    StateUpdate { agent_id: String, data: AgentState },

    /// Reply to a `history` control request
    #[serde(rename = "history")]
    History {
        agent_id: String,
        history: Vec<AgentState>,
    },

    /// Reply to an unparsable control frame
    #[serde(rename = "error")]
    Error { error: String },
}

impl ServerMessage {
    pub fn full_state(data: HashMap<String, AgentState>) -> Self {
        Self::FullState { data }
    }

    pub fn state_update(agent_id: &str, data: AgentState) -> Self {
        Self::StateUpdate {
            agent_id: agent_id.to_string(),
            data,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Serialize into a queueable frame, tagged with the agent it concerns
    pub fn to_frame(&self) -> serde_json::Result<OutboundFrame> {
        let text = serde_json::to_string(self)?;
        Ok(match self {
            Self::StateUpdate { agent_id, .. } => OutboundFrame::for_agent(agent_id, text),
            _ => OutboundFrame::new(text),
        })
    }
}

/// Client → Server control messages
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Only forward updates for the listed agents
    #[serde(rename = "subscribe")]
    Subscribe { agent_id: String },
    #[serde(rename = "unsubscribe")]
    Unsubscribe { agent_id: String },
    /// Ask for an agent's retained history on this connection
    #[serde(rename = "history")]
    History {
        agent_id: String,
        #[serde(default)]
        limit: Option<i64>,
    },
}
