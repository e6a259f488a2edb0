//! Distributed key generation
//!
//! Every participant deals a random polynomial of degree `t` with Feldman
//! commitments, sends each peer its evaluation, and sums what it receives.
//! The result is a [`KeyShare`]: a Shamir share of the joint secret plus the
//! joint public key, identical across participants.

mod engine;
mod messages;

pub use engine::KeygenEngine;
pub use messages::KeygenMessage;

use crate::crypto::point_from_hex;
use crate::{Result, SortKey};
use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One participant's output of key generation
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct KeyShare {
    /// Evaluation point of this share (the dealer-side party index)
    #[zeroize(skip)]
    pub index: usize,

    /// Sort key of the party that produced this share
    #[zeroize(skip)]
    pub key: SortKey,

    /// Number of parties that took part in key generation
    #[zeroize(skip)]
    pub n_parties: usize,

    /// Polynomial degree; `threshold + 1` shares are needed to sign
    #[zeroize(skip)]
    pub threshold: usize,

    /// This party's secret share `x_i`
    #[serde(with = "scalar_hex")]
    pub secret_share: Scalar,

    /// Joint public key (compressed SEC1, hex)
    #[zeroize(skip)]
    pub public_key: String,

    /// `x_j·G` for every party in sort-key order (compressed SEC1, hex)
    #[zeroize(skip)]
    pub public_shares: Vec<String>,

    /// Creation timestamp (Unix seconds)
    #[zeroize(skip)]
    pub created_at: i64,
}

impl KeyShare {
    /// Get the joint public key as a ProjectivePoint
    pub fn public_key_point(&self) -> Result<ProjectivePoint> {
        point_from_hex(&self.public_key)
    }

    /// Public image of this party's secret share
    pub fn public_share(&self) -> ProjectivePoint {
        ProjectivePoint::GENERATOR * self.secret_share
    }
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("index", &self.index)
            .field("key", &self.key)
            .field("n_parties", &self.n_parties)
            .field("threshold", &self.threshold)
            .field("secret_share", &"[REDACTED]")
            .field("public_key", &self.public_key)
            .field("created_at", &self.created_at)
            .finish()
    }
}

mod scalar_hex {
    use crate::crypto::{scalar_from_hex, scalar_to_hex};
    use k256::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&scalar_to_hex(scalar))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        scalar_from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}
