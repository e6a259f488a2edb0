//! Feldman-VSS key generation engine
//!
//! Round 1 broadcasts the commitments to a random polynomial of degree `t`.
//! Round 2 sends each peer the polynomial evaluated at its index. Messages
//! may arrive in any order and before [`start`](ProtocolEngine::start); they
//! are buffered until the engine has everything it needs.

use super::{KeyShare, KeygenMessage};
use crate::crypto::{
    evaluate_commitments, evaluate_polynomial, point_from_hex, point_to_hex,
    random_nonzero_scalar, scalar_from_hex, scalar_to_hex,
};
use crate::mpc::{EngineChannels, EngineError, ProtocolEngine, ProtocolMessage};
use crate::{PartyId, PeerContext, SortKey};
use async_trait::async_trait;
use k256::{ProjectivePoint, Scalar};
use std::collections::BTreeMap;
use tracing::{debug, info};
use zeroize::Zeroize;

/// Key generation state machine for one party
pub struct KeygenEngine {
    me: PartyId,
    context: PeerContext,
    threshold: usize,
    channels: EngineChannels<KeyShare>,
    started: bool,
    coefficients: Vec<Scalar>,
    own_share: Option<Scalar>,
    commitments: BTreeMap<SortKey, Vec<ProjectivePoint>>,
    shares: BTreeMap<SortKey, Scalar>,
}

impl KeygenEngine {
    /// Create a new engine for `me` among `context` with polynomial degree `threshold`
    pub fn new(
        me: PartyId,
        context: PeerContext,
        threshold: usize,
        channels: EngineChannels<KeyShare>,
    ) -> Self {
        Self {
            me,
            context,
            threshold,
            channels,
            started: false,
            coefficients: Vec::new(),
            own_share: None,
            commitments: BTreeMap::new(),
            shares: BTreeMap::new(),
        }
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.threshold >= self.context.len() {
            return Err(EngineError::InvalidParameters(format!(
                "threshold {} must be below party count {}",
                self.threshold,
                self.context.len()
            )));
        }
        if !self.context.contains(&self.me) {
            return Err(EngineError::InvalidParameters(format!(
                "party {} is not part of the peer context",
                self.me
            )));
        }
        Ok(())
    }

    fn on_commitments(
        &mut self,
        from: &PartyId,
        is_broadcast: bool,
        encoded: Vec<String>,
    ) -> Result<bool, EngineError> {
        if !is_broadcast {
            return Err(unexpected(from, "commitments must be broadcast"));
        }
        if encoded.len() != self.threshold + 1 {
            return Err(malformed(
                from,
                format!(
                    "expected {} commitments, got {}",
                    self.threshold + 1,
                    encoded.len()
                ),
            ));
        }
        if self.commitments.contains_key(&from.key()) {
            return Err(unexpected(from, "duplicate commitments"));
        }

        let points = encoded
            .iter()
            .map(|c| point_from_hex(c))
            .collect::<crate::Result<Vec<_>>>()
            .map_err(|e| malformed(from, e.to_string()))?;
        self.commitments.insert(from.key(), points);
        Ok(true)
    }

    fn on_share(
        &mut self,
        from: &PartyId,
        is_broadcast: bool,
        encoded: String,
    ) -> Result<bool, EngineError> {
        if is_broadcast {
            return Err(unexpected(from, "shares must be directed"));
        }
        if self.shares.contains_key(&from.key()) {
            return Err(unexpected(from, "duplicate share"));
        }

        let share = scalar_from_hex(&encoded).map_err(|e| malformed(from, e.to_string()))?;
        self.shares.insert(from.key(), share);
        Ok(true)
    }

    /// Combine everything once all commitments and shares are in
    fn try_finish(&mut self) -> Result<(), EngineError> {
        let n = self.context.len();
        let Some(own_share) = self.own_share else {
            return Ok(());
        };
        if self.channels.is_complete()
            || self.commitments.len() < n
            || self.shares.len() < n - 1
        {
            return Ok(());
        }

        let my_index = self.me.index() as u64;
        let mut secret_share = own_share;
        for (sender, share) in &self.shares {
            let commitments = self
                .commitments
                .get(sender)
                .ok_or_else(|| EngineError::Verification(format!("missing commitments of {sender}")))?;
            if ProjectivePoint::GENERATOR * share != evaluate_commitments(commitments, my_index) {
                return Err(EngineError::Verification(format!(
                    "share from {sender} does not match its commitments"
                )));
            }
            secret_share += share;
        }

        let public_key = self
            .commitments
            .values()
            .fold(ProjectivePoint::IDENTITY, |acc, c| acc + c[0]);
        let public_shares: Vec<ProjectivePoint> = self
            .context
            .parties()
            .iter()
            .map(|party| {
                self.commitments
                    .values()
                    .fold(ProjectivePoint::IDENTITY, |acc, c| {
                        acc + evaluate_commitments(c, party.index() as u64)
                    })
            })
            .collect();

        let position = self
            .context
            .position(&self.me)
            .ok_or_else(|| EngineError::InvalidParameters("party left the context".into()))?;
        if public_shares[position] != ProjectivePoint::GENERATOR * secret_share {
            return Err(EngineError::Verification(
                "combined share does not match the public share".into(),
            ));
        }

        let key_share = KeyShare {
            index: self.me.index(),
            key: self.me.key(),
            n_parties: n,
            threshold: self.threshold,
            secret_share,
            public_key: point_to_hex(&public_key),
            public_shares: public_shares.iter().map(point_to_hex).collect(),
            created_at: chrono::Utc::now().timestamp(),
        };

        self.coefficients.zeroize();
        self.shares.values_mut().for_each(|s| s.zeroize());

        info!(
            party = %self.me,
            public_key = %key_share.public_key,
            "key generation complete"
        );
        self.channels.complete(key_share)
    }
}

#[async_trait]
impl ProtocolEngine for KeygenEngine {
    type Output = KeyShare;

    async fn start(&mut self) -> Result<(), EngineError> {
        if self.started {
            return Err(EngineError::AlreadyStarted);
        }
        self.validate()?;
        self.started = true;

        // ============ Round 1: Commitment ============
        self.coefficients = (0..=self.threshold)
            .map(|_| random_nonzero_scalar())
            .collect();
        let commitments: Vec<ProjectivePoint> = self
            .coefficients
            .iter()
            .map(|c| ProjectivePoint::GENERATOR * c)
            .collect();

        debug!(party = %self.me, round = 1, "broadcasting commitments");
        let round1 = KeygenMessage::Commitments {
            commitments: commitments.iter().map(point_to_hex).collect(),
        };
        self.channels
            .send(ProtocolMessage::broadcast(self.me.clone(), round1.to_bytes()?))
            .await?;
        self.commitments.insert(self.me.key(), commitments);

        // ============ Round 2: Secret Sharing ============
        for party in self.context.parties() {
            if *party == self.me {
                continue;
            }
            let share = evaluate_polynomial(&self.coefficients, party.index() as u64);
            let round2 = KeygenMessage::Share {
                share: scalar_to_hex(&share),
            };
            debug!(party = %self.me, round = 2, to = %party, "sending share");
            self.channels
                .send(ProtocolMessage::directed(
                    self.me.clone(),
                    vec![party.clone()],
                    round2.to_bytes()?,
                ))
                .await?;
        }
        self.own_share = Some(evaluate_polynomial(
            &self.coefficients,
            self.me.index() as u64,
        ));

        self.try_finish()
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
        if !self.context.contains(from) || *from == self.me {
            return Err(unexpected(from, "sender is not a peer"));
        }

        let msg = KeygenMessage::from_bytes(payload).map_err(|e| malformed(from, e.to_string()))?;
        debug!(party = %self.me, from = %from, round = msg.round(), "keygen message");

        let accepted = match msg {
            KeygenMessage::Commitments { commitments } => {
                self.on_commitments(from, is_broadcast, commitments)?
            }
            KeygenMessage::Share { share } => self.on_share(from, is_broadcast, share)?,
        };

        self.try_finish()?;
        Ok(accepted)
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
