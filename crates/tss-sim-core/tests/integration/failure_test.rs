//! Failure handling through the orchestrator

use crate::orchestrator;
use tss_sim_core::{Error, OperationKind};

/// Generate with zero parties is a configuration error
#[tokio::test]
async fn test_generate_zero_parties() {
    let (_dir, orchestrator) = orchestrator();
    assert!(matches!(
        orchestrator.generate(0, 0).await,
        Err(Error::InvalidConfig(_))
    ));
}

/// Generate with t >= n is rejected and leaves the stored key set alone
#[tokio::test]
async fn test_rejected_generate_keeps_key_shares() {
    let (_dir, orchestrator) = orchestrator();
    orchestrator.generate(3, 1).await.unwrap();

    assert!(matches!(
        orchestrator.generate(3, 3).await,
        Err(Error::InvalidConfig(_))
    ));
    assert_eq!(orchestrator.store().load_key_shares().await.unwrap().len(), 3);

    orchestrator.sign(3, 1, "hello").await.unwrap();
    assert!(orchestrator.verify("hello").await.unwrap());
}

/// Sign with t >= n fails before touching storage
#[tokio::test]
async fn test_sign_threshold_not_below_n() {
    let (_dir, orchestrator) = orchestrator();
    orchestrator.generate(3, 1).await.unwrap();

    assert!(matches!(
        orchestrator.sign(3, 3, "hello").await,
        Err(Error::InvalidConfig(_))
    ));
    assert!(
        orchestrator
            .store()
            .list(OperationKind::Sign)
            .await
            .unwrap()
            .is_empty()
    );
}

/// Too few stored shares fail fast
#[tokio::test]
async fn test_not_enough_shares() {
    let (dir, orchestrator) = orchestrator();
    orchestrator.generate(3, 2).await.unwrap();
    std::fs::remove_file(dir.path().join("keygen-3.json")).unwrap();

    assert!(matches!(
        orchestrator.sign(3, 2, "hello").await,
        Err(Error::NotEnoughShares {
            required: 3,
            available: 2
        })
    ));
}

/// Shares generated for another threshold are rejected before signing starts
#[tokio::test]
async fn test_threshold_mismatch_keeps_signatures() {
    let (_dir, orchestrator) = orchestrator();
    orchestrator.generate(3, 1).await.unwrap();
    orchestrator.sign(3, 1, "hello").await.unwrap();

    assert!(matches!(
        orchestrator.sign(3, 2, "hello").await,
        Err(Error::InvalidConfig(_))
    ));
    assert_eq!(
        orchestrator
            .store()
            .list(OperationKind::Sign)
            .await
            .unwrap()
            .len(),
        2
    );
    assert!(orchestrator.verify("hello").await.unwrap());
}

/// A corrupted signature file is a content mismatch, not an invalid signature
#[tokio::test]
async fn test_corrupted_signature_file() {
    let (dir, orchestrator) = orchestrator();
    orchestrator.generate(3, 1).await.unwrap();
    orchestrator.sign(3, 1, "hello").await.unwrap();

    let path = dir.path().join("sig-2.json");
    let mut data = std::fs::read(&path).unwrap();
    data.extend_from_slice(b"\n");
    std::fs::write(&path, data).unwrap();

    assert!(matches!(
        orchestrator.verify("hello").await,
        Err(Error::SignatureMismatch(_))
    ));
}

/// Verify without any signature files
#[tokio::test]
async fn test_verify_without_signatures() {
    let (_dir, orchestrator) = orchestrator();
    orchestrator.generate(2, 1).await.unwrap();

    assert!(matches!(
        orchestrator.verify("hello").await,
        Err(Error::NoSignatures)
    ));
}

/// Verify with signatures but no key shares
#[tokio::test]
async fn test_verify_without_key_shares() {
    let (dir, orchestrator) = orchestrator();
    orchestrator.generate(2, 1).await.unwrap();
    orchestrator.sign(2, 1, "hello").await.unwrap();
    for name in ["keygen-1.json", "keygen-2.json"] {
        std::fs::remove_file(dir.path().join(name)).unwrap();
    }

    assert!(matches!(
        orchestrator.verify("hello").await,
        Err(Error::NotEnoughShares { .. })
    ));
}
