use crate::gateway::protocol::{ClientMessage, ServerMessage};
use crate::hub::BroadcastHub;
use crate::observer::{ObserverId, OutboundFrame};
use anyhow::{anyhow, Result};
use axum::extract::ws::{Message, WebSocket};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Observer connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Drives a single observer WebSocket from upgrade to teardown.
///
/// Teardown always ends in exactly one `on_observer_leave` call, whether the
/// client closed, the socket errored, a send failed or stalled, or the hub
/// evicted this observer and dropped its queue.
///
/// Every socket write is bounded by the hub's send timeout. A peer that stops
/// reading is torn down instead of pinning this task.
pub struct ObserverConnection {
    hub: Arc<BroadcastHub>,
    phase: ConnectionPhase,
    /// Agent filter; empty forwards every update
    subscriptions: HashSet<String>,
    /// Limit applied to history requests that omit one
    default_history_limit: i64,
}

impl ObserverConnection {
    pub fn new(hub: Arc<BroadcastHub>, default_history_limit: i64) -> Self {
        Self {
            hub,
            phase: ConnectionPhase::Connecting,
            subscriptions: HashSet::new(),
            default_history_limit,
        }
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    fn transition(&mut self, id: &ObserverId, next: ConnectionPhase) {
        debug!(observer_id = %id, from = ?self.phase, to = ?next, "Connection phase changed");
        self.phase = next;
    }

    /// Handle WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket) {
        let (observer, mut outbound) = self.hub.observer_channel();
        let id = observer.id();

        if let Err(e) = self.hub.on_observer_join(observer).await {
            error!(observer_id = %id, error = %e, "Observer join failed");
        } else {
            self.transition(&id, ConnectionPhase::Open);
            self.run(&id, &mut socket, &mut outbound).await;
        }

        self.transition(&id, ConnectionPhase::Closing);
        if let Err(e) = self.send(&mut socket, Message::Close(None)).await {
            debug!(observer_id = %id, error = %e, "Close frame not sent");
        }
        self.hub.on_observer_leave(&id);
        drop(socket);
        self.transition(&id, ConnectionPhase::Closed);
        self.hub.on_connection_closed();

        info!(observer_id = %id, "WebSocket connection closed");
    }

    async fn run(
        &mut self,
        id: &ObserverId,
        socket: &mut WebSocket,
        outbound: &mut tokio::sync::mpsc::Receiver<OutboundFrame>,
    ) {
        loop {
            tokio::select! {
                // Keep reading inbound frames so keep-alive and backpressure work
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if let Err(e) = self.handle_client_message(socket, &text).await {
                                error!(observer_id = %id, error = %e, "Failed to answer client message");
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(observer_id = %id, "WebSocket client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = self.send(socket, Message::Pong(data)).await {
                                error!(observer_id = %id, error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong messages
                        }
                        Some(Err(e)) => {
                            warn!(observer_id = %id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                frame = outbound.recv() => {
                    match frame {
                        Some(frame) => {
                            if !self.should_forward(&frame) {
                                continue;
                            }
                            let msg = Message::Text(frame.text.to_string());
                            if let Err(e) = self.send(socket, msg).await {
                                error!(observer_id = %id, error = %e, "Failed to send frame");
                                break;
                            }
                        }
                        None => {
                            // Evicted by the hub or hub shut down
                            info!(observer_id = %id, "Observer queue closed");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Write one message, failing if the peer does not accept it in time
    async fn send(&self, socket: &mut WebSocket, msg: Message) -> Result<()> {
        let timeout = self.hub.send_timeout();
        match tokio::time::timeout(timeout, socket.send(msg)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(anyhow!("socket write stalled for {:?}", timeout)),
        }
    }

    /// Handle client control message (filter or history request)
    async fn handle_client_message(&mut self, socket: &mut WebSocket, text: &str) -> Result<()> {
        let reply = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => self.apply_client_message(msg),
            Err(e) => {
                warn!(error = %e, "Malformed client message");
                Some(ServerMessage::error(format!("invalid message: {}", e)))
            }
        };

        if let Some(reply) = reply {
            let json = serde_json::to_string(&reply)?;
            self.send(socket, Message::Text(json)).await?;
        }

        Ok(())
    }

    /// Update connection state for a control message, returning any reply
    pub(crate) fn apply_client_message(&mut self, msg: ClientMessage) -> Option<ServerMessage> {
        match msg {
            ClientMessage::Subscribe { agent_id } => {
                debug!(agent_id = %agent_id, "Client subscribed to agent");
                self.subscriptions.insert(agent_id);
                None
            }
            ClientMessage::Unsubscribe { agent_id } => {
                debug!(agent_id = %agent_id, "Client unsubscribed from agent");
                self.subscriptions.remove(&agent_id);
                None
            }
            ClientMessage::History { agent_id, limit } => {
                let limit = limit.unwrap_or(self.default_history_limit);
                let history = self.hub.history(&agent_id, limit);
                Some(ServerMessage::History { agent_id, history })
            }
        }
    }

    /// Check if a queued frame passes this connection's agent filter
    pub(crate) fn should_forward(&self, frame: &OutboundFrame) -> bool {
        if self.subscriptions.is_empty() {
            return true;
        }
        match &frame.agent_id {
            Some(agent_id) => self.subscriptions.contains(agent_id.as_ref()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection() -> ObserverConnection {
        ObserverConnection::new(Arc::new(BroadcastHub::new()), 20)
    }

    #[test]
    fn test_starts_connecting() {
        assert_eq!(connection().phase(), ConnectionPhase::Connecting);
    }

    #[test]
    fn test_empty_filter_forwards_everything() {
        let conn = connection();
        assert!(conn.should_forward(&OutboundFrame::for_agent("agent-1", "{}")));
        assert!(conn.should_forward(&OutboundFrame::new("{}")));
    }

    #[test]
    fn test_filter_limits_updates_but_not_full_state() {
        let mut conn = connection();
        conn.apply_client_message(ClientMessage::Subscribe {
            agent_id: "agent-1".to_string(),
        });

        assert!(conn.should_forward(&OutboundFrame::for_agent("agent-1", "{}")));
        assert!(!conn.should_forward(&OutboundFrame::for_agent("agent-2", "{}")));
        assert!(conn.should_forward(&OutboundFrame::new("{}")));

        conn.apply_client_message(ClientMessage::Unsubscribe {
            agent_id: "agent-1".to_string(),
        });
        assert!(conn.should_forward(&OutboundFrame::for_agent("agent-2", "{}")));
    }

    #[tokio::test]
    async fn test_history_request_reads_from_hub() {
        let hub = Arc::new(BroadcastHub::new());
        for i in 0..3 {
            hub.ingest("agent-1", json!({ "progress": i }).as_object().cloned().unwrap())
                .await;
        }
        let mut conn = ObserverConnection::new(Arc::clone(&hub), 20);

        let reply = conn.apply_client_message(ClientMessage::History {
            agent_id: "agent-1".to_string(),
            limit: Some(2),
        });

        match reply {
            Some(ServerMessage::History { agent_id, history }) => {
                assert_eq!(agent_id, "agent-1");
                assert_eq!(history.len(), 2);
                assert_eq!(history[1].state["progress"], 2);
            }
            other => panic!("expected history reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_history_request_without_limit_uses_default() {
        let hub = Arc::new(BroadcastHub::new());
        for i in 0..30 {
            hub.ingest("agent-1", json!({ "progress": i }).as_object().cloned().unwrap())
                .await;
        }
        let mut conn = ObserverConnection::new(Arc::clone(&hub), 20);

        let reply = conn.apply_client_message(ClientMessage::History {
            agent_id: "agent-1".to_string(),
            limit: None,
        });

        match reply {
            Some(ServerMessage::History { history, .. }) => {
                assert_eq!(history.len(), 20);
                assert_eq!(history[0].state["progress"], 10);
                assert_eq!(history[19].state["progress"], 29);
            }
            other => panic!("expected history reply, got {:?}", other),
        }
    }
}
