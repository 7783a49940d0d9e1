//! WebSocket protocol message definitions
//! These are the wire types for peer-to-peer and local control traffic

use serde::{Deserialize, Serialize};

use crate::game::combat::Spell;
use crate::game::snapshot::MatchView;
use crate::gesture::{Action, Hand};

/// Messages exchanged with the remote peer.
///
/// No envelope, no sequence number, no acknowledgment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkMessage {
    /// Opponent cast a spell; only damaging spells are ever sent
    SpellCast { spell: Spell },

    /// Opponent threw a punch
    Punch,

    /// Sender's own health after resolving incoming damage.
    /// Signed so out-of-range reports can be clamped on receipt.
    HealthUpdate { health: i64 },
}

/// Messages from the local tracker / UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Landmarks for the current video frame
    Frame {
        #[serde(default)]
        hands: Vec<Hand>,
    },

    /// Start a new match
    Start,

    /// Stop the match and return to idle
    Exit,

    /// Touch control: one-shot action
    Tap { action: Action },

    /// Touch control: block button held or released
    Hold { active: bool },
}

/// Messages to the local UI
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Full match view, sent whenever it changes
    View(MatchView),
}

/// Decoding failures. Callers drop the payload and carry on.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl NetworkMessage {
    /// Parse an inbound text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientMsg {
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}
