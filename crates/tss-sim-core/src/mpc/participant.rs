//! Participant runtime
//!
//! A participant owns one protocol engine plus its outbound queue, mailbox,
//! error slot and completion slot. Once spawned it moves through
//! `Idle -> Running -> {Completed | Failed}`:
//!
//! - the router task drains the outbound queue into peer mailboxes
//! - the inbound task decodes mailbox messages and feeds the engine
//! - the start task runs the engine's round 1
//! - the error task logs every entry of the error slot
//! - the owning task waits for completion (or a start failure), persists the
//!   result, fires the done signal, and then tears everything down
//!
//! Teardown happens exactly once, in the owning task, after the done signal.

use super::{
    EngineChannels, Mailbox, MailboxSender, PartyTable, ProtocolEngine, ProtocolError,
    ProtocolMessage, Router, mailbox,
};
use crate::PartyId;
use crate::storage::{OperationKind, ResultStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

/// Lifecycle state of a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantState {
    /// Constructed, engine not started
    Idle,
    /// Engine started, drains running
    Running,
    /// Result produced and persisted
    Completed,
    /// Engine failed to start or the result could not be persisted
    Failed,
}

/// Terminal status carried by the done signal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParticipantStatus {
    /// Result persisted at `path`
    Completed { path: PathBuf },
    /// No result will be produced
    Failed { reason: String },
}

/// Done signal payload
#[derive(Debug, Clone)]
pub struct ParticipantOutcome {
    /// Participant that finished
    pub party: PartyId,
    /// How it finished
    pub status: ParticipantStatus,
}

impl ParticipantOutcome {
    /// Whether the participant completed successfully
    pub fn is_completed(&self) -> bool {
        matches!(self.status, ParticipantStatus::Completed { .. })
    }
}

/// One logical party with its engine and channels, before it is spawned
pub struct Participant<E: ProtocolEngine> {
    id: PartyId,
    engine: E,
    mailbox: Mailbox,
    outbound: mpsc::Receiver<ProtocolMessage>,
    errors_tx: mpsc::Sender<ProtocolError>,
    errors: mpsc::Receiver<ProtocolError>,
    completion: oneshot::Receiver<E::Output>,
}

impl<E: ProtocolEngine> Participant<E> {
    /// Create a participant whose engine is built from its output channels
    ///
    /// Returns the participant and the writer half of its mailbox, to be
    /// registered in the [`PartyTable`].
    pub fn new<F>(id: PartyId, capacity: usize, build: F) -> (Self, MailboxSender)
    where
        F: FnOnce(EngineChannels<E::Output>) -> E,
    {
        let capacity = capacity.max(1);
        let (outbound_tx, outbound) = mpsc::channel(capacity);
        let (errors_tx, errors) = mpsc::channel(capacity);
        let (completion_tx, completion) = oneshot::channel();
        let engine = build(EngineChannels::new(
            outbound_tx,
            errors_tx.clone(),
            completion_tx,
        ));
        let (mailbox_tx, mailbox) = mailbox(id.clone(), capacity);

        let participant = Self {
            id,
            engine,
            mailbox,
            outbound,
            errors_tx,
            errors,
            completion,
        };
        (participant, mailbox_tx)
    }

    /// Participant identity
    pub fn id(&self) -> &PartyId {
        &self.id
    }

    /// Start the engine and all drains; results are persisted as `kind`
    pub fn spawn(
        self,
        table: Arc<PartyTable>,
        store: Arc<ResultStore>,
        kind: OperationKind,
    ) -> ParticipantHandle {
        let id = self.id.clone();
        let (state_tx, state) = watch::channel(ParticipantState::Idle);
        let (done_tx, done) = oneshot::channel();
        let task = tokio::spawn(self.run(table, store, kind, state_tx, done_tx));

        ParticipantHandle {
            id,
            state,
            done,
            task,
        }
    }

    async fn run(
        self,
        table: Arc<PartyTable>,
        store: Arc<ResultStore>,
        kind: OperationKind,
        state: watch::Sender<ParticipantState>,
        done: oneshot::Sender<ParticipantOutcome>,
    ) {
        let Participant {
            id,
            engine,
            mailbox,
            outbound,
            errors_tx,
            errors,
            mut completion,
        } = self;
        let engine = Arc::new(Mutex::new(engine));

        // Dropping the set aborts every child, so an aborted runtime leaks nothing
        let mut tasks = JoinSet::new();
        tasks.spawn(Router::new(id.clone(), table).run(outbound));
        tasks.spawn(drain_errors(id.clone(), errors));
        let inbound = tasks.spawn(drain_inbound(
            id.clone(),
            mailbox,
            Arc::clone(&engine),
            errors_tx.clone(),
        ));

        let (start_tx, mut start_rx) = oneshot::channel();
        let starter = {
            let engine = Arc::clone(&engine);
            tasks.spawn(async move {
                let result = engine.lock().await.start().await;
                let _ = start_tx.send(result);
            })
        };

        state.send_replace(ParticipantState::Running);
        info!(party = %id, %kind, "participant running");

        let mut started = false;
        let status = loop {
            tokio::select! {
                output = &mut completion => {
                    break match output {
                        Ok(output) => match store.persist(kind, id.key(), &output).await {
                            Ok(path) => {
                                info!(party = %id, path = %path.display(), "{kind} protocol complete");
                                ParticipantStatus::Completed { path }
                            }
                            Err(e) => {
                                error!(party = %id, error = %e, "failed to persist result");
                                ParticipantStatus::Failed {
                                    reason: format!("failed to persist result: {e}"),
                                }
                            }
                        },
                        Err(_) => ParticipantStatus::Failed {
                            reason: "engine dropped its completion slot".into(),
                        },
                    };
                }
                result = &mut start_rx, if !started => {
                    started = true;
                    match result {
                        Ok(Ok(())) => debug!(party = %id, "engine started"),
                        Ok(Err(err)) => {
                            let reason = err.to_string();
                            let _ = errors_tx.send(ProtocolError::Start(err)).await;
                            break ParticipantStatus::Failed { reason };
                        }
                        Err(_) => {
                            break ParticipantStatus::Failed {
                                reason: "engine start task ended without a result".into(),
                            };
                        }
                    }
                }
            }
        };

        // Round 1 output always reaches the router, even when completion won the race
        if !started {
            let _ = (&mut start_rx).await;
        }

        let terminal = match status {
            ParticipantStatus::Completed { .. } => ParticipantState::Completed,
            ParticipantStatus::Failed { .. } => ParticipantState::Failed,
        };
        state.send_replace(terminal);

        let outcome = ParticipantOutcome {
            party: id.clone(),
            status,
        };
        if done.send(outcome).is_err() {
            debug!(party = %id, "done signal has no listener");
        }

        // Stop consuming, release the engine (and with it the outbound and
        // error senders), then let the router flush what is still queued.
        inbound.abort();
        starter.abort();
        drop(errors_tx);
        drop(engine);
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                if e.is_panic() {
                    error!(party = %id, "participant task panicked: {e}");
                }
            }
        }
        debug!(party = %id, "participant torn down");
    }
}

/// Handle to a spawned participant
#[derive(Debug)]
pub struct ParticipantHandle {
    id: PartyId,
    state: watch::Receiver<ParticipantState>,
    done: oneshot::Receiver<ParticipantOutcome>,
    task: JoinHandle<()>,
}

impl ParticipantHandle {
    /// Participant identity
    pub fn id(&self) -> &PartyId {
        &self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ParticipantState {
        *self.state.borrow()
    }

    /// Split into identity, done signal and owning task
    pub fn into_parts(
        self,
    ) -> (
        PartyId,
        oneshot::Receiver<ParticipantOutcome>,
        JoinHandle<()>,
    ) {
        (self.id, self.done, self.task)
    }

    /// Wait for the done signal, then for teardown to finish
    pub async fn wait(self) -> crate::Result<ParticipantOutcome> {
        let outcome = self.done.await.map_err(|_| {
            crate::Error::Internal(format!(
                "participant {} exited without signalling done",
                self.id
            ))
        })?;
        self.task
            .await
            .map_err(|e| crate::Error::Internal(e.to_string()))?;
        Ok(outcome)
    }
}

/// Feed every mailbox message to the engine; decode failures skip the message
async fn drain_inbound<E: ProtocolEngine>(
    id: PartyId,
    mut mailbox: Mailbox,
    engine: Arc<Mutex<E>>,
    errors: mpsc::Sender<ProtocolError>,
) {
    while let Some(msg) = mailbox.recv().await {
        let (payload, routing) = match msg.wire_bytes() {
            Ok(decoded) => decoded,
            Err(e) => {
                let _ = errors.send(ProtocolError::Wire(e)).await;
                continue;
            }
        };
        debug!(
            party = %id,
            from = %routing.from,
            broadcast = routing.is_broadcast,
            "received message"
        );

        let result = engine
            .lock()
            .await
            .update_from_bytes(payload, &routing.from, routing.is_broadcast)
            .await;
        match result {
            Ok(true) => {}
            Ok(false) => debug!(party = %id, from = %routing.from, "message not accepted"),
            Err(e) => {
                let _ = errors.send(ProtocolError::Engine(e)).await;
            }
        }
    }
}

/// Log every error reported for this participant until the slot closes
async fn drain_errors(id: PartyId, mut errors: mpsc::Receiver<ProtocolError>) {
    while let Some(err) = errors.recv().await {
        warn!(party = %id, error = %err, "protocol error");
    }
}
