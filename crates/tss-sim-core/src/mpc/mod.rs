//! Same-process simulated network
//!
//! This module provides the transport and lifecycle layer for protocol
//! execution. Protocol engines are opaque: the runtime feeds them inbound
//! wire bytes and routes whatever they put on their outbound queue.
//!
//! ```text
//! engine ─► outbound queue ─► Router ─► peer Mailbox ─► inbound drain ─► peer engine
//! ```

mod engine;
mod mailbox;
mod message;
mod participant;
mod router;

pub use engine::{EngineChannels, EngineError, ProtocolEngine};
pub use mailbox::{Mailbox, MailboxClosed, MailboxSender, mailbox};
pub use message::{MessageRouting, ProtocolMessage, WireError};
pub use participant::{
    Participant, ParticipantHandle, ParticipantOutcome, ParticipantState, ParticipantStatus,
};
pub use router::{PartyTable, Router};

use thiserror::Error;

/// Entries of a participant's error slot (advisory, never fatal on their own)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound message could not be decoded and was skipped
    #[error("failed to parse wire message: {0}")]
    Wire(#[from] WireError),

    /// Engine rejected an inbound message or reported a problem
    #[error("failed to update from bytes: {0}")]
    Engine(EngineError),

    /// Engine could not start
    #[error("failed to start protocol: {0}")]
    Start(EngineError),
}
