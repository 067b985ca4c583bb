use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for the hub. All operations are lock-free.
#[derive(Default)]
pub struct HubMetrics {
    ingested: AtomicU64,
    deliveries: AtomicU64,
    evictions: AtomicU64,
    joins: AtomicU64,
    leaves: AtomicU64,
    connections_closed: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_ingest(&self) {
        self.ingested.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_deliveries(&self, count: u64) {
        self.deliveries.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_leave(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Capture counters alongside the caller-supplied gauges
    pub fn snapshot(&self, connected_observers: usize, known_agents: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            total_ingested: self.ingested.load(Ordering::Relaxed),
            total_deliveries: self.deliveries.load(Ordering::Relaxed),
            total_evictions: self.evictions.load(Ordering::Relaxed),
            total_joins: self.joins.load(Ordering::Relaxed),
            total_leaves: self.leaves.load(Ordering::Relaxed),
            total_connections_closed: self.connections_closed.load(Ordering::Relaxed),
            connected_observers,
            known_agents,
        }
    }
}

/// Point-in-time metrics, as served by `GET /api/metrics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_ingested: u64,
    pub total_deliveries: u64,
    pub total_evictions: u64,
    pub total_joins: u64,
    pub total_leaves: u64,
    /// Observer sockets torn down, including evicted ones
    pub total_connections_closed: u64,
    pub connected_observers: usize,
    pub known_agents: usize,
}
