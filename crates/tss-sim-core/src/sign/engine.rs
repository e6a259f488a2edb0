//! Threshold ECDSA signing engine
//!
//! With signers at positions `0..L` (sort-key order), nonce `k = Πk_i` and
//! secret `x = Σλ_i·x_i`, the signature is
//!
//! ```text
//! s = k⁻¹·(z + r·x) = Σ_i (Πk_j⁻¹)·(z_i + r·λ_i·x_i),   z_0 = z, z_i = 0 otherwise
//! ```
//!
//! Each term starts at its owner multiplied by the owner's `k_i⁻¹` and then
//! walks the signer ring, picking up every other `k_j⁻¹`. When it returns to
//! its owner it is that owner's additive part of `s`.

use super::{SignatureData, SigningMessage};
use crate::crypto::{
    lagrange_coefficient, point_from_hex, point_to_hex, random_nonzero_scalar, scalar_from_hex,
    scalar_to_hex, x_coordinate, y_is_odd,
};
use crate::keygen::KeyShare;
use crate::mpc::{EngineChannels, EngineError, ProtocolEngine, ProtocolMessage};
use crate::{PartyId, PeerContext, SortKey};
use async_trait::async_trait;
use k256::{ProjectivePoint, Scalar, elliptic_curve::scalar::IsHigh};
use std::collections::BTreeMap;
use tracing::{debug, info};
use zeroize::Zeroize;

/// Nonce material of one signer
struct Nonce {
    k: Scalar,
    k_inv: Scalar,
}

impl Drop for Nonce {
    fn drop(&mut self) {
        self.k.zeroize();
        self.k_inv.zeroize();
    }
}

/// Signing state machine for one signer
pub struct SigningEngine {
    me: PartyId,
    context: PeerContext,
    threshold: usize,
    key_share: KeyShare,
    digest: Scalar,
    channels: EngineChannels<SignatureData>,

    position: Option<usize>,
    public_key: ProjectivePoint,
    nonce: Option<Nonce>,
    announces: BTreeMap<SortKey, usize>,
    chain_in: Option<ProjectivePoint>,
    chain_sent: bool,
    big_r: Option<ProjectivePoint>,
    tokens: Vec<(SortKey, Scalar)>,
    token_sent: bool,
    own_partial: Option<Scalar>,
    partial_sent: bool,
    partials: BTreeMap<SortKey, Scalar>,
}

impl SigningEngine {
    /// Create a new signer
    ///
    /// `context` holds exactly the `threshold + 1` signers of this round and
    /// `digest` is the value being signed.
    pub fn new(
        me: PartyId,
        context: PeerContext,
        threshold: usize,
        key_share: KeyShare,
        digest: Scalar,
        channels: EngineChannels<SignatureData>,
    ) -> Self {
        let position = context.position(&me);
        Self {
            me,
            context,
            threshold,
            key_share,
            digest,
            channels,
            position,
            public_key: ProjectivePoint::IDENTITY,
            nonce: None,
            announces: BTreeMap::new(),
            chain_in: None,
            chain_sent: false,
            big_r: None,
            tokens: Vec::new(),
            token_sent: false,
            own_partial: None,
            partial_sent: false,
            partials: BTreeMap::new(),
        }
    }

    fn signers(&self) -> usize {
        self.context.len()
    }

    fn position(&self) -> Result<usize, EngineError> {
        self.position
            .ok_or_else(|| EngineError::InvalidParameters(format!("party {} is not a signer", self.me)))
    }

    fn next(&self) -> Result<PartyId, EngineError> {
        let next = (self.position()? + 1) % self.signers();
        self.context
            .at(next)
            .cloned()
            .ok_or_else(|| EngineError::InvalidParameters(format!("no signer at position {next}")))
    }

    fn position_of(&self, from: &PartyId) -> Result<usize, EngineError> {
        self.context
            .position(from)
            .ok_or_else(|| unexpected(from, "sender is not a signer"))
    }

    fn nonce(&self) -> Result<&Nonce, EngineError> {
        self.nonce
            .as_ref()
            .ok_or_else(|| EngineError::Crypto("nonce not generated".into()))
    }

    async fn send_to_next(&self, msg: &SigningMessage) -> Result<(), EngineError> {
        let next = self.next()?;
        self.channels
            .send(ProtocolMessage::directed(
                self.me.clone(),
                vec![next],
                msg.to_bytes()?,
            ))
            .await
    }

    async fn broadcast(&self, msg: &SigningMessage) -> Result<(), EngineError> {
        self.channels
            .send(ProtocolMessage::broadcast(self.me.clone(), msg.to_bytes()?))
            .await
    }

    fn validate(&mut self) -> Result<(), EngineError> {
        if self.key_share.threshold != self.threshold {
            return Err(EngineError::InvalidParameters(format!(
                "key share was generated for threshold {}, not {}",
                self.key_share.threshold, self.threshold
            )));
        }
        if self.signers() != self.threshold + 1 {
            return Err(EngineError::InvalidParameters(format!(
                "threshold {} needs {} signers, got {}",
                self.threshold,
                self.threshold + 1,
                self.signers()
            )));
        }
        self.position()?;
        self.public_key = self.key_share.public_key_point()?;
        Ok(())
    }

    /// Move every stage forward as far as the collected state allows
    async fn advance(&mut self) -> Result<(), EngineError> {
        if self.nonce.is_none() || self.channels.is_complete() {
            return Ok(());
        }
        let position = self.position()?;
        let last = self.signers() - 1;

        // ============ Nonce chain ============
        if !self.chain_sent {
            let k = self.nonce()?.k;
            let product = if position == 0 {
                Some(ProjectivePoint::GENERATOR * k)
            } else {
                self.chain_in.map(|prev| prev * k)
            };
            if let Some(product) = product {
                self.chain_sent = true;
                if position == last {
                    debug!(party = %self.me, "nonce point complete");
                    if last > 0 {
                        self.broadcast(&SigningMessage::NoncePoint {
                            point: point_to_hex(&product),
                        })
                        .await?;
                    }
                    self.big_r = Some(product);
                } else {
                    self.send_to_next(&SigningMessage::NonceChain {
                        point: point_to_hex(&product),
                    })
                    .await?;
                }
            }
        }

        // ============ Token ring ============
        let k_inv = self.nonce()?.k_inv;
        for (origin, value) in std::mem::take(&mut self.tokens) {
            if origin == self.me.key() {
                self.own_partial = Some(value);
            } else {
                self.send_to_next(&SigningMessage::Token {
                    origin,
                    value: scalar_to_hex(&(value * k_inv)),
                })
                .await?;
            }
        }

        if !self.token_sent && self.announces.len() == self.signers() {
            if let Some(big_r) = self.big_r {
                let r = x_coordinate(&big_r)
                    .ok_or_else(|| EngineError::Crypto("nonce point is the identity".into()))?;
                let indices: Vec<usize> = self.announces.values().copied().collect();
                let lambda = lagrange_coefficient(self.key_share.index, &indices)?;

                let mut contribution = r * lambda * self.key_share.secret_share;
                if position == 0 {
                    contribution += self.digest;
                }
                let blinded = contribution * k_inv;
                contribution.zeroize();

                self.token_sent = true;
                if last == 0 {
                    self.own_partial = Some(blinded);
                } else {
                    self.send_to_next(&SigningMessage::Token {
                        origin: self.me.key(),
                        value: scalar_to_hex(&blinded),
                    })
                    .await?;
                }
            }
        }

        // ============ Partial signatures ============
        if !self.partial_sent {
            if let Some(partial) = self.own_partial {
                self.partial_sent = true;
                if last > 0 {
                    self.broadcast(&SigningMessage::Partial {
                        s: scalar_to_hex(&partial),
                    })
                    .await?;
                }
                self.partials.insert(self.me.key(), partial);
            }
        }

        if self.partials.len() == self.signers() {
            self.finish()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), EngineError> {
        let big_r = self
            .big_r
            .ok_or_else(|| EngineError::Crypto("nonce point missing".into()))?;
        let r = x_coordinate(&big_r)
            .ok_or_else(|| EngineError::Crypto("nonce point is the identity".into()))?;
        let mut s = self.partials.values().fold(Scalar::ZERO, |acc, p| acc + p);
        if bool::from(s.is_zero()) || bool::from(r.is_zero()) {
            return Err(EngineError::Crypto("degenerate signature".into()));
        }

        let mut recovery_id = y_is_odd(&big_r) as u8;
        if bool::from(s.is_high()) {
            s = -s;
            recovery_id ^= 1;
        }

        let signature = SignatureData::new(&r, &s, recovery_id, &self.digest);
        if !signature.verify(&self.public_key, &self.digest)? {
            return Err(EngineError::Verification(
                "assembled signature does not verify".into(),
            ));
        }

        info!(party = %self.me, r = %signature.r, "signing complete");
        self.channels.complete(signature)
    }

    fn on_announce(
        &mut self,
        from: &PartyId,
        share_index: usize,
        public_key: &str,
    ) -> Result<(), EngineError> {
        if public_key != self.key_share.public_key {
            return Err(EngineError::Verification(format!(
                "{from} signs for a different public key"
            )));
        }
        if self.announces.insert(from.key(), share_index).is_some() {
            return Err(unexpected(from, "duplicate announce"));
        }
        Ok(())
    }

    fn on_nonce_chain(&mut self, from: &PartyId, point: &str) -> Result<(), EngineError> {
        let position = self.position()?;
        if position == 0 || self.position_of(from)? + 1 != position {
            return Err(unexpected(from, "nonce chain out of order"));
        }
        if self.chain_in.is_some() {
            return Err(unexpected(from, "duplicate nonce chain"));
        }
        self.chain_in = Some(point_from_hex(point).map_err(|e| malformed(from, e.to_string()))?);
        Ok(())
    }

    fn on_nonce_point(&mut self, from: &PartyId, point: &str) -> Result<(), EngineError> {
        if self.position_of(from)? != self.signers() - 1 {
            return Err(unexpected(from, "nonce point from a signer other than the last"));
        }
        if self.big_r.is_some() {
            return Err(unexpected(from, "duplicate nonce point"));
        }
        self.big_r = Some(point_from_hex(point).map_err(|e| malformed(from, e.to_string()))?);
        Ok(())
    }

    fn on_token(&mut self, from: &PartyId, origin: SortKey, value: &str) -> Result<(), EngineError> {
        let signers = self.signers();
        if (self.position_of(from)? + 1) % signers != self.position()? {
            return Err(unexpected(from, "token from a signer other than the previous"));
        }
        if self.context.get(origin).is_none() {
            return Err(unexpected(from, format!("token of unknown signer {origin}")));
        }
        let value = scalar_from_hex(value).map_err(|e| malformed(from, e.to_string()))?;
        self.tokens.push((origin, value));
        Ok(())
    }

    fn on_partial(&mut self, from: &PartyId, s: &str) -> Result<(), EngineError> {
        let value = scalar_from_hex(s).map_err(|e| malformed(from, e.to_string()))?;
        if self.partials.insert(from.key(), value).is_some() {
            return Err(unexpected(from, "duplicate partial"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProtocolEngine for SigningEngine {
    type Output = SignatureData;

    async fn start(&mut self) -> Result<(), EngineError> {
        if self.nonce.is_some() {
            return Err(EngineError::AlreadyStarted);
        }
        self.validate()?;

        let k = random_nonzero_scalar();
        let k_inv = Option::<Scalar>::from(k.invert())
            .ok_or_else(|| EngineError::Crypto("nonce not invertible".into()))?;
        self.nonce = Some(Nonce { k, k_inv });

        let position = self.position()?;
        debug!(
            party = %self.me,
            position,
            signers = self.signers(),
            "starting signing"
        );
        self.announces.insert(self.me.key(), self.key_share.index);
        self.broadcast(&SigningMessage::Announce {
            share_index: self.key_share.index,
            public_key: self.key_share.public_key.clone(),
        })
        .await?;

        self.advance().await
    }

    async fn update_from_bytes(
        &mut self,
        payload: &[u8],
        from: &PartyId,
        is_broadcast: bool,
    ) -> Result<bool, EngineError> {
        if self.channels.is_complete() {
            return Ok(false);
        }
        if *from == self.me {
            return Err(unexpected(from, "message from self"));
        }
        self.position_of(from)?;

        let msg = SigningMessage::from_bytes(payload).map_err(|e| malformed(from, e.to_string()))?;
        debug!(party = %self.me, from = %from, round = msg.round(), "signing message");

        let expects_broadcast = matches!(
            msg,
            SigningMessage::Announce { .. }
                | SigningMessage::NoncePoint { .. }
                | SigningMessage::Partial { .. }
        );
        if expects_broadcast != is_broadcast {
            return Err(unexpected(
                from,
                format!("{} sent with the wrong delivery mode", msg.round()),
            ));
        }

        match &msg {
            SigningMessage::Announce {
                share_index,
                public_key,
            } => self.on_announce(from, *share_index, public_key)?,
            SigningMessage::NonceChain { point } => self.on_nonce_chain(from, point)?,
            SigningMessage::NoncePoint { point } => self.on_nonce_point(from, point)?,
            SigningMessage::Token { origin, value } => self.on_token(from, *origin, value)?,
            SigningMessage::Partial { s } => self.on_partial(from, s)?,
        }

        self.advance().await?;
        Ok(true)
    }
}

fn malformed(from: &PartyId, reason: impl Into<String>) -> EngineError {
    EngineError::Malformed {
        from: from.to_string(),
        reason: reason.into(),
    }
}

fn unexpected(from: &PartyId, reason: impl Into<String>) -> EngineError {
    EngineError::Unexpected {
        from: from.to_string(),
        reason: reason.into(),
    }
}
