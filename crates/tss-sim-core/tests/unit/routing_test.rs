//! Routing tests through the public mailbox and router API

use std::sync::Arc;
use std::time::Duration;
use tss_sim_core::build_party_ids;
use tss_sim_core::mpc::{Mailbox, PartyTable, ProtocolMessage, Router, mailbox};

fn network(n: usize, capacity: usize) -> (Vec<tss_sim_core::PartyId>, Arc<PartyTable>, Vec<Mailbox>) {
    let parties = build_party_ids(n);
    let (senders, mailboxes): (Vec<_>, Vec<_>) = parties
        .iter()
        .map(|p| mailbox(p.clone(), capacity))
        .unzip();
    (parties, Arc::new(PartyTable::new(senders)), mailboxes)
}

/// Every broadcast reaches every other mailbox exactly once
#[tokio::test]
async fn test_broadcast_from_every_party() {
    let (parties, table, mut mailboxes) = network(5, 16);

    for party in &parties {
        let router = Router::new(party.clone(), Arc::clone(&table));
        let delivered = router
            .route(ProtocolMessage::broadcast(party.clone(), vec![party.index() as u8]))
            .await;
        assert_eq!(delivered, 4);
    }

    for (i, mailbox) in mailboxes.iter_mut().enumerate() {
        let mut senders = Vec::new();
        while let Some(msg) = mailbox.try_recv() {
            senders.push(msg.from().index());
        }
        senders.sort();
        let expected: Vec<usize> = (1..=5).filter(|s| *s != i + 1).collect();
        assert_eq!(senders, expected);
    }
}

/// A router blocked on a full mailbox resumes once the owner drains it
#[tokio::test]
async fn test_router_backpressure() {
    let (parties, table, mut mailboxes) = network(2, 1);
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    let router = tokio::spawn(Router::new(parties[0].clone(), table).run(rx));

    for tag in 0..4u8 {
        tx.send(ProtocolMessage::directed(
            parties[0].clone(),
            vec![parties[1].clone()],
            vec![tag],
        ))
        .await
        .unwrap();
    }
    drop(tx);

    // Router cannot finish while three messages wait for space
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!router.is_finished());

    let mut received = Vec::new();
    for _ in 0..4 {
        let msg = mailboxes[1].recv().await.unwrap();
        received.push(msg.wire_bytes().unwrap().0[0]);
    }
    router.await.unwrap();
    assert_eq!(received, vec![0, 1, 2, 3]);
}

/// Directed messages never leak to parties outside the recipient set
#[tokio::test]
async fn test_directed_isolation() {
    let (parties, table, mut mailboxes) = network(4, 16);
    let router = Router::new(parties[3].clone(), table);

    router
        .route(ProtocolMessage::directed(
            parties[3].clone(),
            vec![parties[0].clone()],
            b"secret".to_vec(),
        ))
        .await;

    assert!(mailboxes[0].try_recv().is_some());
    for mailbox in mailboxes.iter_mut().skip(1) {
        assert!(mailbox.try_recv().is_none());
    }
}
