// Agent state snapshots and bounded per-agent history

mod history;
mod snapshot;

pub use history::{BoundedHistory, StateHistoryStore, DEFAULT_HISTORY_CAPACITY};
pub use snapshot::{AgentState, StatePayload};
