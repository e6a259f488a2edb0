//! Bounded per-participant inbound queues
//!
//! A mailbox is the boundary between routing and protocol-engine
//! consumption. Delivery into a full mailbox waits until the owner drains an
//! entry; messages are never dropped.

use super::ProtocolMessage;
use crate::PartyId;
use thiserror::Error;
use tokio::sync::mpsc;

/// Delivery failed because the owning participant has torn down
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("mailbox of {0} is closed")]
pub struct MailboxClosed(pub String);

/// Create a mailbox for `owner` holding at most `capacity` messages
pub fn mailbox(owner: PartyId, capacity: usize) -> (MailboxSender, Mailbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MailboxSender {
            owner: owner.clone(),
            tx,
        },
        Mailbox { owner, rx },
    )
}

/// Writer half of a mailbox, shared by every router
#[derive(Debug, Clone)]
pub struct MailboxSender {
    owner: PartyId,
    tx: mpsc::Sender<ProtocolMessage>,
}

impl MailboxSender {
    /// Identity of the mailbox owner
    pub fn owner(&self) -> &PartyId {
        &self.owner
    }

    /// Enqueue a message, waiting while the mailbox is full
    pub async fn deliver(&self, msg: ProtocolMessage) -> Result<(), MailboxClosed> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| MailboxClosed(self.owner.to_string()))
    }

    /// Whether the owner has stopped reading
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Free slots left before delivery starts to wait
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

/// Reader half of a mailbox, owned by the participant's inbound drain
#[derive(Debug)]
pub struct Mailbox {
    owner: PartyId,
    rx: mpsc::Receiver<ProtocolMessage>,
}

impl Mailbox {
    /// Identity of the mailbox owner
    pub fn owner(&self) -> &PartyId {
        &self.owner
    }

    /// Next message in FIFO order, `None` once closed and drained
    pub async fn recv(&mut self) -> Option<ProtocolMessage> {
        self.rx.recv().await
    }

    /// Next message if one is already queued
    pub fn try_recv(&mut self) -> Option<ProtocolMessage> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting new deliveries; queued messages can still be read
    pub fn close(&mut self) {
        self.rx.close();
    }
}
