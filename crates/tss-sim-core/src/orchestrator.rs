//! Operation orchestration
//!
//! The [`Orchestrator`] builds one participant per party, wires every router
//! to a shared read-only [`PartyTable`], starts all engines and waits until
//! every participant is done. The first failed participant or an expired
//! deadline aborts the whole operation.

use crate::config::SimulationConfig;
use crate::keygen::KeygenEngine;
use crate::mpc::{
    MailboxSender, Participant, ParticipantOutcome, ParticipantStatus, PartyTable, ProtocolEngine,
};
use crate::party::{PeerContext, build_party_ids};
use crate::sign::{SignatureData, SigningEngine, message_digest};
use crate::storage::{OperationKind, ResultStore};
use crate::{Error, Result, verifier};
use futures_util::{FutureExt, StreamExt, stream::FuturesUnordered};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Runs key generation, signing and verification over a [`ResultStore`]
#[derive(Debug)]
pub struct Orchestrator {
    config: SimulationConfig,
    store: Arc<ResultStore>,
}

impl Orchestrator {
    /// Create a new orchestrator storing results under `config.output_dir`
    pub fn new(config: SimulationConfig) -> Result<Self> {
        if config.mailbox_capacity == 0 {
            return Err(Error::InvalidConfig(
                "mailbox capacity must be at least 1".into(),
            ));
        }
        let store = Arc::new(ResultStore::new(&config.output_dir)?);
        Ok(Self { config, store })
    }

    /// Active configuration
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Underlying result store
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run key generation among `n` parties with polynomial degree `threshold`
    ///
    /// Returns the paths of the persisted key shares in party order.
    #[instrument(skip(self))]
    pub async fn generate(&self, n: usize, threshold: usize) -> Result<Vec<PathBuf>> {
        if n == 0 {
            return Err(Error::InvalidConfig(
                "party count must be at least 1".into(),
            ));
        }
        if threshold >= n {
            return Err(Error::InvalidConfig(format!(
                "threshold {threshold} must be below party count {n}"
            )));
        }

        let parties = build_party_ids(n);
        let context = PeerContext::new(parties.clone())?;
        self.store.clear(OperationKind::Keygen).await?;

        info!(n, threshold, "starting key generation");
        let capacity = self.config.mailbox_capacity;
        let (participants, senders): (Vec<_>, Vec<_>) = parties
            .into_iter()
            .map(|id| {
                let context = context.clone();
                Participant::<KeygenEngine>::new(id.clone(), capacity, move |channels| {
                    KeygenEngine::new(id, context, threshold, channels)
                })
            })
            .unzip();

        let outcomes = self
            .run_participants(participants, senders, OperationKind::Keygen)
            .await?;
        info!(n, "key generation finished");
        Ok(completed_paths(outcomes))
    }

    /// Sign `message` with `threshold + 1` of the stored key shares
    ///
    /// Fails before any participant starts when `threshold >= n`, when
    /// fewer than `threshold + 1` key shares are stored, or when the stored
    /// shares were generated for another threshold. Signature files of an
    /// earlier signing round are removed only after these checks pass.
    #[instrument(skip(self))]
    pub async fn sign(&self, n: usize, threshold: usize, message: &str) -> Result<SignatureData> {
        if threshold >= n {
            return Err(Error::InvalidConfig(format!(
                "threshold {threshold} must be below party count {n}"
            )));
        }
        let signers = threshold + 1;

        let shares = self.store.load_key_shares().await?;
        if shares.len() < signers {
            return Err(Error::NotEnoughShares {
                required: signers,
                available: shares.len(),
            });
        }
        if let Some(share) = shares.values().find(|share| share.threshold != threshold) {
            return Err(Error::InvalidConfig(format!(
                "key share {} was generated with threshold {}, not {threshold}",
                share.key, share.threshold
            )));
        }

        let digest = message_digest(message)?;
        let parties = build_party_ids(signers);
        let context = PeerContext::new(parties.clone())?;
        let removed = self.store.clear(OperationKind::Sign).await?;
        if removed > 0 {
            debug!(removed, "removed signatures of an earlier round");
        }

        info!(signers, threshold, "starting signing");
        let capacity = self.config.mailbox_capacity;
        let (participants, senders): (Vec<_>, Vec<_>) = parties
            .into_iter()
            .zip(shares.into_values())
            .map(|(id, share)| {
                let context = context.clone();
                Participant::<SigningEngine>::new(id.clone(), capacity, move |channels| {
                    SigningEngine::new(id, context, threshold, share, digest, channels)
                })
            })
            .unzip();

        self.run_participants(participants, senders, OperationKind::Sign)
            .await?;

        let signature = self.store.load_signatures(signers).await?;
        info!(r = %signature.r, s = %signature.s, "signing finished");
        Ok(signature)
    }

    /// Verify the stored signature over `message`
    pub async fn verify(&self, message: &str) -> Result<bool> {
        verifier::verify(&self.store, message).await
    }

    /// Spawn every participant and wait for all of them to finish
    async fn run_participants<E: ProtocolEngine>(
        &self,
        participants: Vec<Participant<E>>,
        senders: Vec<MailboxSender>,
        kind: OperationKind,
    ) -> Result<Vec<ParticipantOutcome>> {
        let total = participants.len();
        let table = Arc::new(PartyTable::new(senders));

        let mut tasks = Vec::with_capacity(total);
        let mut pending = FuturesUnordered::new();
        for participant in participants {
            let handle = participant.spawn(Arc::clone(&table), Arc::clone(&self.store), kind);
            let (id, done, task) = handle.into_parts();
            tasks.push(task);
            pending.push(done.map(move |result| (id, result)));
        }
        drop(table);

        let mut outcomes = Vec::with_capacity(total);
        let wait_all = async {
            while let Some((party, result)) = pending.next().await {
                let outcome = result.map_err(|_| {
                    Error::Internal(format!("participant {party} exited without signalling done"))
                })?;
                if let ParticipantStatus::Failed { reason } = &outcome.status {
                    return Err(Error::ParticipantFailed {
                        party: party.to_string(),
                        reason: reason.clone(),
                    });
                }
                debug!(party = %party, done = outcomes.len() + 1, total, "participant done");
                outcomes.push(outcome);
            }
            Ok::<(), Error>(())
        };

        let waited = match self.config.operation_timeout() {
            Some(deadline) => tokio::time::timeout(deadline, wait_all)
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Timeout(format!(
                        "{kind} to finish after {}s",
                        deadline.as_secs()
                    )))
                }),
            None => wait_all.await,
        };

        if let Err(e) = &waited {
            error!(%kind, error = %e, "aborting operation");
            for task in &tasks {
                task.abort();
            }
        }
        for task in tasks {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!(%kind, "participant panicked: {e}");
                }
            }
        }

        waited.map(|()| outcomes)
    }
}

fn completed_paths(mut outcomes: Vec<ParticipantOutcome>) -> Vec<PathBuf> {
    outcomes.sort_by(|a, b| a.party.cmp(&b.party));
    outcomes
        .into_iter()
        .filter_map(|outcome| match outcome.status {
            ParticipantStatus::Completed { path } => Some(path),
            ParticipantStatus::Failed { .. } => None,
        })
        .collect()
}
