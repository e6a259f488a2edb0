//! Key generation wire messages

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Payload carried in [`ProtocolMessage`](crate::mpc::ProtocolMessage) wire bytes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "round", rename_all = "snake_case")]
pub enum KeygenMessage {
    /// Round 1 broadcast: commitments `a_j·G` to the sender's polynomial
    Commitments { commitments: Vec<String> },
    /// Round 2 directed: the sender's polynomial evaluated at the recipient
    Share { share: String },
}

impl KeygenMessage {
    /// Round number
    pub fn round(&self) -> u32 {
        match self {
            KeygenMessage::Commitments { .. } => 1,
            KeygenMessage::Share { .. } => 2,
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
