//! Participant runtime tests with the key generation engine

use std::sync::Arc;
use std::time::Duration;
use tss_sim_core::mpc::{Participant, ParticipantState, ParticipantStatus, PartyTable};
use tss_sim_core::{KeygenEngine, OperationKind, PeerContext, ResultStore, build_party_ids};

/// Spawn a full key generation network by hand and watch it finish
#[tokio::test]
async fn test_keygen_participants_reach_completed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ResultStore::new(dir.path()).unwrap());
    let parties = build_party_ids(3);
    let context = PeerContext::new(parties.clone()).unwrap();

    let (participants, senders): (Vec<_>, Vec<_>) = parties
        .iter()
        .map(|id| {
            let (id, context) = (id.clone(), context.clone());
            Participant::<KeygenEngine>::new(id.clone(), 64, move |channels| {
                KeygenEngine::new(id, context, 1, channels)
            })
        })
        .unzip();
    let table = Arc::new(PartyTable::new(senders));

    let handles: Vec<_> = participants
        .into_iter()
        .map(|p| p.spawn(Arc::clone(&table), Arc::clone(&store), OperationKind::Keygen))
        .collect();

    for handle in handles {
        let outcome = tokio::time::timeout(Duration::from_secs(10), handle.wait())
            .await
            .unwrap()
            .unwrap();
        match outcome.status {
            ParticipantStatus::Completed { path } => {
                let expected = store.path_for(OperationKind::Keygen, outcome.party.key());
                assert_eq!(path, expected);
            }
            ParticipantStatus::Failed { reason } => panic!("participant failed: {reason}"),
        }
    }

    assert_eq!(store.load_key_shares().await.unwrap().len(), 3);
}

/// Invalid parameters end in Failed rather than hanging
#[tokio::test]
async fn test_invalid_threshold_reaches_failed() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(ResultStore::new(dir.path()).unwrap());
    let parties = build_party_ids(2);
    let context = PeerContext::new(parties.clone()).unwrap();

    let (participant, sender) = Participant::<KeygenEngine>::new(parties[0].clone(), 8, {
        let id = parties[0].clone();
        move |channels| KeygenEngine::new(id, context, 5, channels)
    });
    let table = Arc::new(PartyTable::new([sender]));
    let handle = participant.spawn(table, store, OperationKind::Keygen);

    let outcome = tokio::time::timeout(Duration::from_secs(10), async {
        let state_before = handle.state();
        assert_ne!(state_before, ParticipantState::Completed);
        handle.wait().await
    })
    .await
    .unwrap()
    .unwrap();

    assert!(!outcome.is_completed());
    match outcome.status {
        ParticipantStatus::Failed { reason } => assert!(reason.contains("threshold")),
        other => panic!("unexpected status {other:?}"),
    }
}
