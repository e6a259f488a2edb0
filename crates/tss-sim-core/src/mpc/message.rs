//! Protocol messages as they travel between participants

use crate::PartyId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Routing metadata attached to every protocol message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRouting {
    /// Sender identity
    pub from: PartyId,
    /// Explicit recipients (`None` or empty = broadcast to all others)
    pub to: Option<Vec<PartyId>>,
    /// Broadcast flag carried by the wire encoding
    pub is_broadcast: bool,
}

/// Decode failures for inbound wire messages
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WireError {
    /// Message carries no payload
    #[error("empty wire payload from {0}")]
    EmptyPayload(String),

    /// Broadcast flag contradicts the recipient list
    #[error("message from {from} is flagged broadcast but addressed to {recipients} recipient(s)")]
    BroadcastMismatch { from: String, recipients: usize },
}

/// Opaque protocol payload plus routing metadata; immutable once built
#[derive(Debug, Clone)]
pub struct ProtocolMessage {
    routing: MessageRouting,
    wire: Vec<u8>,
}

impl ProtocolMessage {
    /// Message for every participant except the sender
    pub fn broadcast(from: PartyId, wire: Vec<u8>) -> Self {
        Self {
            routing: MessageRouting {
                from,
                to: None,
                is_broadcast: true,
            },
            wire,
        }
    }

    /// Message for an explicit recipient set
    pub fn directed(from: PartyId, to: Vec<PartyId>, wire: Vec<u8>) -> Self {
        Self {
            routing: MessageRouting {
                from,
                to: Some(to),
                is_broadcast: false,
            },
            wire,
        }
    }

    /// Message from raw parts, without any consistency check
    pub fn from_parts(routing: MessageRouting, wire: Vec<u8>) -> Self {
        Self { routing, wire }
    }

    /// Sender identity
    pub fn from(&self) -> &PartyId {
        &self.routing.from
    }

    /// Explicit recipients, `None` when the message is a broadcast
    pub fn to(&self) -> Option<&[PartyId]> {
        match self.routing.to.as_deref() {
            Some([]) | None => None,
            Some(to) => Some(to),
        }
    }

    /// Whether the router fans this message out to every other participant
    pub fn is_broadcast(&self) -> bool {
        self.to().is_none()
    }

    /// Routing metadata
    pub fn routing(&self) -> &MessageRouting {
        &self.routing
    }

    /// Decode the wire payload together with its routing metadata
    pub fn wire_bytes(&self) -> Result<(&[u8], &MessageRouting), WireError> {
        if self.wire.is_empty() {
            return Err(WireError::EmptyPayload(self.routing.from.to_string()));
        }

        let recipients = self.routing.to.as_ref().map_or(0, Vec::len);
        if self.routing.is_broadcast && recipients > 0 {
            return Err(WireError::BroadcastMismatch {
                from: self.routing.from.to_string(),
                recipients,
            });
        }

        Ok((&self.wire, &self.routing))
    }
}
