//! Outbound side of the peer link
//!
//! Sends are best-effort. The match never waits on delivery and never retries.

use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::NetworkMessage;

/// Outbound frames buffered per peer before sends start failing
pub const PEER_SEND_BUFFER: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("peer channel is not open")]
    NotOpen,

    #[error("peer channel closed or full")]
    Closed,

    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Anything the session can push peer messages into
pub trait Transport: Send {
    fn send(&self, msg: &NetworkMessage) -> Result<(), TransportError>;
}

/// A live peer socket, fed through its writer task
#[derive(Debug, Clone)]
pub struct PeerLink {
    pub id: Uuid,
    tx: mpsc::Sender<String>,
}

impl PeerLink {
    /// Returns the link and the receiver its writer task drains
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(PEER_SEND_BUFFER);
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }
}

impl Transport for PeerLink {
    fn send(&self, msg: &NetworkMessage) -> Result<(), TransportError> {
        let text = msg.encode()?;
        self.tx.try_send(text).map_err(|_| TransportError::Closed)
    }
}

/// Send through an optional link, swallowing every failure
pub fn send_best_effort(link: Option<&dyn Transport>, msg: &NetworkMessage) {
    let result = match link {
        Some(link) => link.send(msg),
        None => Err(TransportError::NotOpen),
    };
    if let Err(e) = result {
        tracing::debug!(error = %e, ?msg, "Dropped outbound peer message");
    }
}
