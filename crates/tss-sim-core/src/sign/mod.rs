//! Distributed signing
//!
//! `t + 1` holders of key shares jointly produce a standard secp256k1 ECDSA
//! signature without any of them learning the joint secret or the nonce.
//!
//! ## Signing Flow
//!
//! 1. Every signer announces its share index and public key
//! 2. A directed nonce chain builds `R = (k_1·…·k_L)·G` in signer order
//! 3. Each signer's contribution `z_i + r·λ_i·x_i` travels a ring of directed
//!    tokens, picking up every signer's `k_j⁻¹` on the way
//! 4. The finished contributions are broadcast and summed into `s`
//!
//! Every signer checks the assembled signature against the joint public key
//! before emitting it, so all signers emit the same [`SignatureData`].

mod engine;
mod messages;

pub use engine::SigningEngine;
pub use messages::SigningMessage;

use crate::crypto::{scalar_to_hex, verify_ecdsa};
use crate::{Error, Result};
use k256::{
    ProjectivePoint, Scalar,
    elliptic_curve::{bigint::U256, ops::Reduce},
};
use serde::{Deserialize, Serialize};

/// Final signature as persisted by every signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureData {
    /// `r` component (32 bytes, hex)
    pub r: String,
    /// `s` component, low-s normalised (32 bytes, hex)
    pub s: String,
    /// `r || s` (64 bytes, hex)
    pub signature: String,
    /// Parity of `R.y` after normalisation
    pub recovery_id: u8,
    /// Signed digest (32 bytes, hex)
    pub m: String,
}

impl SignatureData {
    /// Assemble the record from its scalar components
    pub fn new(r: &Scalar, s: &Scalar, recovery_id: u8, digest: &Scalar) -> Self {
        let r = scalar_to_hex(r);
        let s = scalar_to_hex(s);
        Self {
            signature: format!("{r}{s}"),
            r,
            s,
            recovery_id,
            m: scalar_to_hex(digest),
        }
    }

    /// `r` as big-endian bytes
    pub fn r_bytes(&self) -> Result<[u8; 32]> {
        decode_component(&self.r, "r")
    }

    /// `s` as big-endian bytes
    pub fn s_bytes(&self) -> Result<[u8; 32]> {
        decode_component(&self.s, "s")
    }

    /// Check this signature over `digest` against `public_key`
    pub fn verify(&self, public_key: &ProjectivePoint, digest: &Scalar) -> Result<bool> {
        Ok(verify_ecdsa(
            public_key,
            digest,
            &self.r_bytes()?,
            &self.s_bytes()?,
        ))
    }
}

fn decode_component(encoded: &str, name: &str) -> Result<[u8; 32]> {
    hex::decode(encoded)?
        .try_into()
        .map_err(|_| Error::Deserialization(format!("Invalid {name} length")))
}

/// Signing digest of a message
///
/// The UTF-8 bytes are hex-round-tripped and read as a big-endian integer.
/// Messages longer than 32 bytes keep their leftmost 32 bytes; the result is
/// reduced modulo the group order. This is not a cryptographic hash.
pub fn message_digest(message: &str) -> Result<Scalar> {
    let bytes = hex::decode(hex::encode(message.as_bytes()))?;

    let mut field = [0u8; 32];
    let take = bytes.len().min(32);
    field[32 - take..].copy_from_slice(&bytes[..take]);

    Ok(<Scalar as Reduce<U256>>::reduce_bytes(&field.into()))
}
