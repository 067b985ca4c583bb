use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use uuid::Uuid;

/// Unique identifier assigned to each observer connection
pub type ObserverId = Uuid;

/// Serialized text frame queued for an observer.
///
/// The text is shared so one broadcast is serialized once regardless of
/// observer count. `agent_id` lets a connection apply its own filter without
/// re-parsing; frames without one (e.g. `full_state`) are never filtered.
#[derive(Clone, Debug)]
pub struct OutboundFrame {
    pub agent_id: Option<Arc<str>>,
    pub text: Arc<str>,
}

impl OutboundFrame {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self {
            agent_id: None,
            text: text.into(),
        }
    }

    pub fn for_agent(agent_id: &str, text: impl Into<Arc<str>>) -> Self {
        Self {
            agent_id: Some(Arc::from(agent_id)),
            text: text.into(),
        }
    }
}

/// Delivery failure for a single observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    /// Connection task is gone (receiver dropped)
    Closed,
    /// Outbound queue stayed full for the whole send timeout
    Timeout,
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Closed => write!(f, "observer connection closed"),
            SendError::Timeout => write!(f, "observer send timed out"),
        }
    }
}

impl std::error::Error for SendError {}

/// Sending half of an observer connection.
///
/// The connection task owns the receiving half and writes queued frames to
/// the socket. Dropping every handle ends that task's outbound stream.
#[derive(Clone, Debug)]
pub struct ObserverHandle {
    id: ObserverId,
    tx: mpsc::Sender<OutboundFrame>,
}

impl ObserverHandle {
    /// Create a handle and the receiver its connection task drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// True once the connection task dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Queue a frame without waiting. A full queue waits at most `timeout`.
    pub async fn deliver(&self, frame: OutboundFrame, timeout: Duration) -> Result<(), SendError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Closed(_)) => Err(SendError::Closed),
            Err(TrySendError::Full(frame)) => {
                self.tx
                    .send_timeout(frame, timeout)
                    .await
                    .map_err(|e| match e {
                        SendTimeoutError::Timeout(_) => SendError::Timeout,
                        SendTimeoutError::Closed(_) => SendError::Closed,
                    })
            }
        }
    }
}

impl PartialEq for ObserverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObserverHandle {}
