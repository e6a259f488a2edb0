//! Full generate / sign / verify flow

use crate::orchestrator;
use tss_sim_core::{OperationKind, message_digest};

/// Generate(3,1) then Sign(3,1,"hello") verifies for "hello" only
#[tokio::test]
async fn test_generate_sign_verify() {
    let (dir, orchestrator) = orchestrator();

    let key_files = orchestrator.generate(3, 1).await.unwrap();
    assert_eq!(key_files.len(), 3);
    for (i, path) in key_files.iter().enumerate() {
        assert_eq!(*path, dir.path().join(format!("keygen-{}.json", i + 1)));
    }

    let signature = orchestrator.sign(3, 1, "hello").await.unwrap();
    assert_eq!(
        signature.m,
        hex::encode(message_digest("hello").unwrap().to_bytes())
    );
    let sig_files = orchestrator.store().list(OperationKind::Sign).await.unwrap();
    assert_eq!(sig_files.len(), 2);

    assert!(orchestrator.verify("hello").await.unwrap());
    assert!(!orchestrator.verify("world").await.unwrap());
}

/// Larger committee with a higher threshold
#[tokio::test]
async fn test_five_parties_threshold_two() {
    let (_dir, orchestrator) = orchestrator();

    orchestrator.generate(5, 2).await.unwrap();
    orchestrator.sign(5, 2, "threshold signing").await.unwrap();

    assert_eq!(
        orchestrator.store().list(OperationKind::Sign).await.unwrap().len(),
        3
    );
    assert!(orchestrator.verify("threshold signing").await.unwrap());
}

/// A second signing round replaces the files of the first
#[tokio::test]
async fn test_resign_replaces_signatures() {
    let (_dir, orchestrator) = orchestrator();

    orchestrator.generate(4, 3).await.unwrap();
    orchestrator.sign(4, 3, "first").await.unwrap();
    orchestrator.sign(4, 3, "second").await.unwrap();

    assert!(orchestrator.verify("second").await.unwrap());
    assert!(!orchestrator.verify("first").await.unwrap());
}

/// Regenerating keys discards the shares of the earlier committee
#[tokio::test]
async fn test_regenerate_with_fewer_parties() {
    let (_dir, orchestrator) = orchestrator();

    orchestrator.generate(5, 1).await.unwrap();
    orchestrator.generate(2, 1).await.unwrap();

    let shares = orchestrator.store().load_key_shares().await.unwrap();
    assert_eq!(shares.len(), 2);

    orchestrator.sign(2, 1, "hello").await.unwrap();
    assert!(orchestrator.verify("hello").await.unwrap());
}

/// One party with threshold zero signs alone
#[tokio::test]
async fn test_single_party_flow() {
    let (_dir, orchestrator) = orchestrator();

    orchestrator.generate(1, 0).await.unwrap();
    // t < n holds for n = 1, t = 0
    orchestrator.sign(1, 0, "solo").await.unwrap();
    assert!(orchestrator.verify("solo").await.unwrap());
}

/// Messages longer than 32 bytes sign over their leftmost 32 bytes
#[tokio::test]
async fn test_long_message() {
    let (_dir, orchestrator) = orchestrator();
    let message = "a message that is clearly longer than thirty-two bytes";

    orchestrator.generate(3, 2).await.unwrap();
    orchestrator.sign(3, 2, message).await.unwrap();

    assert!(orchestrator.verify(message).await.unwrap());
    assert!(orchestrator.verify(&message[..32]).await.unwrap());
}
