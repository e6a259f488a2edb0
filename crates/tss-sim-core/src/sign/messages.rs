//! Signing wire messages

use crate::{Error, Result, SortKey};
use serde::{Deserialize, Serialize};

/// Payload carried in [`ProtocolMessage`](crate::mpc::ProtocolMessage) wire bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "round", rename_all = "snake_case")]
pub enum SigningMessage {
    /// Broadcast: the sender's share index and the public key it signs for
    Announce {
        share_index: usize,
        public_key: String,
    },
    /// Directed to the next signer: running product `(k_1·…·k_i)·G`
    NonceChain { point: String },
    /// Broadcast by the last signer: the finished nonce point `R`
    NoncePoint { point: String },
    /// Directed to the next signer: a contribution of `origin` being blinded
    Token { origin: SortKey, value: String },
    /// Broadcast: the sender's finished additive part of `s`
    Partial { s: String },
}

impl SigningMessage {
    /// Round name used in logs
    pub fn round(&self) -> &'static str {
        match self {
            SigningMessage::Announce { .. } => "announce",
            SigningMessage::NonceChain { .. } => "nonce_chain",
            SigningMessage::NoncePoint { .. } => "nonce_point",
            SigningMessage::Token { .. } => "token",
            SigningMessage::Partial { .. } => "partial",
        }
    }

    /// Encode as wire bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode wire bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
