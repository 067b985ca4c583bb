// Agent state snapshots and bounded history
pub mod state;

// Connected observer tracking
pub mod observer;

// Ingestion and fan-out coordinator
pub mod hub;

// Observer wire protocol and connection lifecycle
pub mod gateway;

// HTTP and WebSocket APIs
pub mod api;

// Configuration
pub mod config;

pub use hub::BroadcastHub;
pub use state::{AgentState, StatePayload};
