// HTTP and WebSocket APIs

mod ingestion;
pub mod history;
pub mod query;
pub mod validation;
pub mod websocket;

pub use history::{create_history_router, HistoryAppState, HistoryResponse};
pub use ingestion::{create_ingestion_router, AppState, IngestResponse};
pub use query::{create_query_router, QueryAppState};
pub use validation::{validate_ingest, ValidationError};
pub use websocket::{create_ws_router, ws_handler, WsAppState};
