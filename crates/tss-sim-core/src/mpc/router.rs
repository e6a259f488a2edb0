//! Outbound message routing
//!
//! Each participant gets one [`Router`] that drains its outbound queue and
//! fans every message into peer mailboxes:
//! - broadcast (no recipients): every mailbox except the router owner's
//! - directed: the mailbox of each listed recipient, looked up by sort key
//!
//! The [`PartyTable`] is built once per operation and only read afterwards.

use super::{MailboxSender, ProtocolMessage};
use crate::{PartyId, SortKey};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Read-only lookup from identity to mailbox, shared by all routers
#[derive(Debug, Default)]
pub struct PartyTable {
    entries: BTreeMap<SortKey, MailboxSender>,
}

impl PartyTable {
    /// Build the table from every participant's mailbox sender
    pub fn new(senders: impl IntoIterator<Item = MailboxSender>) -> Self {
        let entries = senders
            .into_iter()
            .map(|sender| (sender.owner().key(), sender))
            .collect();
        Self { entries }
    }

    /// Mailbox of a party, matched by sort key
    pub fn get(&self, party: &PartyId) -> Option<&MailboxSender> {
        self.entries.get(&party.key())
    }

    /// All mailboxes in sort-key order
    pub fn iter(&self) -> impl Iterator<Item = &MailboxSender> {
        self.entries.values()
    }

    /// Number of registered participants
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Delivers one participant's outbound messages
#[derive(Debug, Clone)]
pub struct Router {
    owner: PartyId,
    table: Arc<PartyTable>,
}

impl Router {
    /// Create a router for `owner`
    pub fn new(owner: PartyId, table: Arc<PartyTable>) -> Self {
        Self { owner, table }
    }

    /// Drain the outbound queue until every sender is gone
    pub async fn run(self, mut outbound: mpsc::Receiver<ProtocolMessage>) {
        while let Some(msg) = outbound.recv().await {
            self.route(msg).await;
        }
        debug!(party = %self.owner, "outbound queue closed, router stopped");
    }

    /// Deliver a single message; returns the number of mailboxes reached
    pub async fn route(&self, msg: ProtocolMessage) -> usize {
        match msg.to() {
            None => self.broadcast(&msg).await,
            Some(recipients) => self.direct(&msg, recipients).await,
        }
    }

    async fn broadcast(&self, msg: &ProtocolMessage) -> usize {
        debug!(party = %self.owner, "routing broadcast message");

        let mut delivered = 0;
        for target in self.table.iter() {
            if *target.owner() == self.owner {
                continue;
            }
            if self.deliver(target, msg.clone()).await {
                delivered += 1;
            }
        }
        delivered
    }

    async fn direct(&self, msg: &ProtocolMessage, recipients: &[PartyId]) -> usize {
        debug!(
            party = %self.owner,
            recipients = recipients.len(),
            "routing directed message"
        );

        let mut delivered = 0;
        for recipient in recipients {
            match self.table.get(recipient) {
                Some(target) => {
                    if self.deliver(target, msg.clone()).await {
                        delivered += 1;
                    }
                }
                None => {
                    warn!(
                        party = %self.owner,
                        recipient = %recipient,
                        "recipient not in participant table, skipping"
                    );
                }
            }
        }
        delivered
    }

    async fn deliver(&self, target: &MailboxSender, msg: ProtocolMessage) -> bool {
        if target.remaining_capacity() == 0 {
            debug!(party = %self.owner, recipient = %target.owner(), "mailbox full, waiting");
        }
        match target.deliver(msg).await {
            Ok(()) => true,
            Err(closed) => {
                debug!(party = %self.owner, "{closed}, recipient already finished");
                false
            }
        }
    }
}
