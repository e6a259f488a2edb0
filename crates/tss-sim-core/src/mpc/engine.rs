//! Protocol engine interface
//!
//! The runtime treats an engine as a black box with two inputs (the start
//! trigger and inbound messages) and three outputs (outbound messages, one
//! completion value, advisory errors). Outputs flow through
//! [`EngineChannels`], handed to the engine when it is constructed.

use super::{ProtocolError, ProtocolMessage};
use crate::PartyId;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Errors raised by a protocol engine
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Parameters rejected before any round runs
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// Engine was started twice
    #[error("engine already started")]
    AlreadyStarted,

    /// Payload could not be parsed
    #[error("malformed message from {from}: {reason}")]
    Malformed { from: String, reason: String },

    /// Message does not fit the current protocol state
    #[error("unexpected message from {from}: {reason}")]
    Unexpected { from: String, reason: String },

    /// A share, commitment or signature failed verification
    #[error("verification failed: {0}")]
    Verification(String),

    /// Cryptographic operation failed
    #[error("crypto error: {0}")]
    Crypto(String),

    /// One of the engine's output channels is gone
    #[error("{0} channel closed")]
    ChannelClosed(&'static str),

    /// A second completion value was produced
    #[error("engine already completed")]
    AlreadyCompleted,
}

impl From<crate::Error> for EngineError {
    fn from(e: crate::Error) -> Self {
        EngineError::Crypto(e.to_string())
    }
}

/// Round-based protocol state machine driven by a participant runtime
#[async_trait]
pub trait ProtocolEngine: Send + 'static {
    /// Terminal value emitted on completion (key share or signature)
    type Output: Serialize + Send + Sync + 'static;

    /// Begin round 1; may emit outbound messages
    async fn start(&mut self) -> Result<(), EngineError>;

    /// Advance with one inbound message; returns whether it was accepted
    async fn update_from_bytes(
        &mut self,
        payload: &[u8],
        from: &PartyId,
        is_broadcast: bool,
    ) -> Result<bool, EngineError>;
}

/// Output side of an engine: outbound queue, error slot, completion slot
#[derive(Debug)]
pub struct EngineChannels<T> {
    outbound: mpsc::Sender<ProtocolMessage>,
    errors: mpsc::Sender<ProtocolError>,
    completion: Option<oneshot::Sender<T>>,
}

impl<T> EngineChannels<T> {
    /// Wrap the runtime-owned channel ends
    pub fn new(
        outbound: mpsc::Sender<ProtocolMessage>,
        errors: mpsc::Sender<ProtocolError>,
        completion: oneshot::Sender<T>,
    ) -> Self {
        Self {
            outbound,
            errors,
            completion: Some(completion),
        }
    }

    /// Queue an outbound message, waiting while the queue is full
    pub async fn send(&self, msg: ProtocolMessage) -> Result<(), EngineError> {
        self.outbound
            .send(msg)
            .await
            .map_err(|_| EngineError::ChannelClosed("outbound"))
    }

    /// Report a non-fatal error
    pub async fn report(&self, err: EngineError) {
        let _ = self.errors.send(ProtocolError::Engine(err)).await;
    }

    /// Emit the terminal value; only the first call succeeds
    pub fn complete(&mut self, value: T) -> Result<(), EngineError> {
        let completion = self
            .completion
            .take()
            .ok_or(EngineError::AlreadyCompleted)?;
        completion
            .send(value)
            .map_err(|_| EngineError::ChannelClosed("completion"))
    }

    /// Whether the terminal value has been emitted
    pub fn is_complete(&self) -> bool {
        self.completion.is_none()
    }
}
