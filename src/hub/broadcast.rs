use crate::config::MonitorConfig;
use crate::gateway::protocol::ServerMessage;
use crate::hub::metrics::{HubMetrics, MetricsSnapshot};
use crate::observer::{ObserverHandle, ObserverId, ObserverRegistry, OutboundFrame, SendError};
use crate::state::{AgentState, StateHistoryStore, StatePayload};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

/// Outcome of one fan-out pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub evicted: usize,
}

/// Failure to hand a newly joined observer its `full_state` snapshot
#[derive(Debug)]
pub enum JoinError {
    Serialize(serde_json::Error),
    Delivery(SendError),
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinError::Serialize(e) => write!(f, "failed to serialize full state: {}", e),
            JoinError::Delivery(e) => write!(f, "failed to deliver full state: {}", e),
        }
    }
}

impl std::error::Error for JoinError {}

/// Single authority over agent state ingestion and observer fan-out.
///
/// Owns the history store and the observer registry; nothing else writes to
/// either. Ingest/broadcast pairs and observer joins are serialized by one
/// async lock, so every observer sees a given agent's updates in ingestion
/// order and a joining observer's `full_state` is queued before any update
/// it will receive.
pub struct BroadcastHub {
    store: StateHistoryStore,
    observers: ObserverRegistry,
    metrics: HubMetrics,

    /// Serializes ingest+broadcast and join snapshots
    fanout: Mutex<()>,

    send_timeout: Duration,
    channel_capacity: usize,
}

impl BroadcastHub {
    /// Create a hub with default history capacity and fan-out settings
    pub fn new() -> Self {
        Self::from_config(&MonitorConfig::default())
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self {
            store: StateHistoryStore::new(config.history.capacity),
            observers: ObserverRegistry::new(),
            metrics: HubMetrics::new(),
            fanout: Mutex::new(()),
            send_timeout: config.observers.send_timeout(),
            channel_capacity: config.observers.channel_capacity,
        }
    }

    /// Record a new state for `agent_id` and fan it out to every observer.
    ///
    /// Never fails from the caller's perspective: delivery failures only
    /// evict the failing observers. The payload is owned by the hub from
    /// here on, so later caller-side mutation cannot reach stored history.
    pub async fn ingest(&self, agent_id: &str, payload: StatePayload) -> AgentState {
        let _guard = self.fanout.lock().await;

        // Timestamps never go backwards for one agent, even if the wall clock does
        let mut timestamp = Utc::now();
        if let Some(previous) = self.store.current(agent_id) {
            if previous.timestamp > timestamp {
                timestamp = previous.timestamp;
            }
        }

        let state = AgentState::new(payload, timestamp);
        self.store.append(agent_id, state.clone());
        self.metrics.record_ingest();

        debug!(agent_id = %agent_id, "Ingested agent state");

        self.broadcast(agent_id, &state).await;

        state
    }

    /// Send a `state_update` to every registered observer.
    ///
    /// Each send is isolated: a closed or persistently full observer is
    /// removed from the registry and the remaining observers still receive
    /// the update. Sends run concurrently so one slow observer costs at most
    /// the send timeout, not a timeout per observer.
    pub async fn broadcast(&self, agent_id: &str, state: &AgentState) -> BroadcastReport {
        let frame = match ServerMessage::state_update(agent_id, state.clone()).to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "Failed to serialize state update");
                return BroadcastReport::default();
            }
        };

        let observers = self.observers.snapshot();
        if observers.is_empty() {
            return BroadcastReport::default();
        }

        let results = join_all(
            observers
                .iter()
                .map(|observer| self.deliver_one(observer, frame.clone())),
        )
        .await;

        // Evict after the pass so the registry is never mutated mid-iteration
        let mut report = BroadcastReport::default();
        for (observer, result) in observers.iter().zip(results) {
            match result {
                Some(Ok(())) => report.delivered += 1,
                Some(Err(e)) => {
                    warn!(
                        observer_id = %observer.id(),
                        agent_id = %agent_id,
                        error = %e,
                        "Evicting observer after failed send"
                    );
                    if self.observers.remove(&observer.id()) {
                        self.metrics.record_eviction();
                        report.evicted += 1;
                    }
                }
                // Deregistered while this pass was running
                None => {}
            }
        }

        self.metrics.record_deliveries(report.delivered as u64);
        report
    }

    async fn deliver_one(
        &self,
        observer: &ObserverHandle,
        frame: OutboundFrame,
    ) -> Option<Result<(), SendError>> {
        if !self.observers.contains(&observer.id()) {
            return None;
        }
        Some(observer.deliver(frame, self.send_timeout).await)
    }

    /// Create the queue for a new observer connection
    pub fn observer_channel(&self) -> (ObserverHandle, mpsc::Receiver<OutboundFrame>) {
        ObserverHandle::channel(self.channel_capacity)
    }

    /// Register an observer and queue its `full_state` snapshot.
    ///
    /// Runs under the fan-out lock: every agent ingested before this call
    /// appears in the snapshot, and every later update is queued after it.
    pub async fn on_observer_join(&self, observer: ObserverHandle) -> Result<(), JoinError> {
        let _guard = self.fanout.lock().await;

        let id = observer.id();
        let frame = ServerMessage::full_state(self.store.all_current())
            .to_frame()
            .map_err(JoinError::Serialize)?;

        // Queue before registering so a failed snapshot never leaves a registered handle
        if let Err(e) = observer.deliver(frame, self.send_timeout).await {
            warn!(observer_id = %id, error = %e, "Failed to send full state to new observer");
            return Err(JoinError::Delivery(e));
        }

        if self.observers.add(observer) {
            self.metrics.record_join();
            info!(
                observer_id = %id,
                observers = self.observers.len(),
                "Observer registered"
            );
        }

        Ok(())
    }

    /// Deregister an observer. Safe to call after eviction or more than once.
    ///
    /// Returns true if this call removed it.
    pub fn on_observer_leave(&self, id: &ObserverId) -> bool {
        let removed = self.observers.remove(id);
        if removed {
            self.metrics.record_leave();
            info!(
                observer_id = %id,
                observers = self.observers.len(),
                "Observer disconnected"
            );
        }
        removed
    }

    /// Record that an observer's socket task finished teardown
    pub(crate) fn on_connection_closed(&self) {
        self.metrics.record_connection_closed();
    }

    /// Upper bound for a single observer write, queue or socket
    pub fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Latest state of one agent
    pub fn current(&self, agent_id: &str) -> Option<AgentState> {
        self.store.current(agent_id)
    }

    /// Up to `limit` most recent states, oldest first (`limit <= 0` for all)
    pub fn history(&self, agent_id: &str, limit: i64) -> Vec<AgentState> {
        self.store.recent(agent_id, limit)
    }

    /// Latest state of every known agent
    pub fn all_current(&self) -> HashMap<String, AgentState> {
        self.store.all_current()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub fn is_observer_registered(&self, id: &ObserverId) -> bool {
        self.observers.contains(id)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics
            .snapshot(self.observers.len(), self.store.agent_count())
    }

    /// Drop every observer handle. Each connection task sees its queue end
    /// and closes its socket.
    pub fn shutdown(&self) {
        let dropped = self.observers.clear();
        info!(observers = dropped, "Broadcast hub shut down");
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
