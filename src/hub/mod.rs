// Ingestion, history ownership and observer fan-out

mod broadcast;
mod metrics;

pub use broadcast::{BroadcastHub, BroadcastReport, JoinError};
pub use metrics::{HubMetrics, MetricsSnapshot};
