//! Artifacts to linkset to credential to ledger, end to end.

use std::sync::Arc;
use std::time::Duration;

use tessera_anchor::{
    build_chain, embed_reference, referenced_digest, AnchorCoordinator, AnchorError,
    AnchorRegistry, Artifact, ChainLayer, InMemoryLedger, Linkset,
};
use tessera_core::Claims;
use tessera_credentials::{Credential, CredentialBuilder};
use tessera_crypto::{Digest, DigestAlgorithm, KeyType};
use tessera_integration_tests::{epoch, World};

struct Scenario {
    world: World,
    ledger: Arc<InMemoryLedger>,
    coordinator: AnchorCoordinator,
    artifacts: Vec<Artifact>,
    linkset: Linkset,
    credential: Credential,
}

async fn scenario() -> Scenario {
    let world = World::new();
    let issuer = world.enroll(KeyType::Ed25519);

    let artifacts = vec![
        Artifact::new("readings.csv", b"station,mm\n7,12.5\n8,0.0\n".to_vec()),
        Artifact::from_json(
            "calibration.json",
            &serde_json::json!({"station": 7, "offset": 0.5}),
        )
        .unwrap(),
    ];
    let linkset = build_chain(&artifacts, DigestAlgorithm::Blake3).unwrap();

    let mut builder = CredentialBuilder {
        types: vec!["RainfallCredential".into()],
        issuer: Some(issuer),
        subject: Claims::new().with("name", "rainfall").with("value", 0.5),
        issuance_date: Some(epoch()),
        ..Default::default()
    };
    embed_reference(&mut builder, &linkset);
    let credential = world.issuer().issue_from(builder, "keys-1").await.unwrap();

    let ledger = Arc::new(InMemoryLedger::new("memory").with_confirmation_depth(3));
    let coordinator = AnchorCoordinator::new(Arc::new(AnchorRegistry::new().with(ledger.clone())))
        .with_polling(Duration::from_millis(5), Duration::from_secs(2));

    Scenario {
        world,
        ledger,
        coordinator,
        artifacts,
        linkset,
        credential,
    }
}

#[tokio::test]
async fn test_anchor_confirm_and_verify() {
    let s = scenario().await;
    assert_eq!(referenced_digest(&s.credential).unwrap(), s.linkset.digest);

    let reference = s
        .coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .unwrap();
    assert!(!s.coordinator.poll(&reference).await.unwrap().is_confirmed());

    let producer = s.ledger.clone().spawn_block_producer(Duration::from_millis(5));
    let status = s.coordinator.await_confirmation(&reference).await.unwrap();
    producer.abort();
    assert!(status.is_confirmed());

    let report = s
        .coordinator
        .verify_chain(&s.artifacts, &s.linkset, &s.credential, &reference)
        .await
        .unwrap();
    assert!(report.is_intact(), "{:?}", report);

    // The anchored credential still passes the verification pipeline.
    s.world
        .trust
        .add_anchor(tessera_identity::TrustAnchor::new(s.credential.issuer.clone()));
    assert!(s.world.verifier().verify(&s.credential).await.is_valid());
}

#[tokio::test]
async fn test_each_layer_reports_its_own_divergence() {
    let s = scenario().await;
    let reference = s
        .coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .unwrap();

    let check = |artifacts: Vec<Artifact>, linkset: Linkset, credential: Credential| {
        let coordinator = &s.coordinator;
        let reference = reference.clone();
        async move {
            coordinator
                .verify_chain(&artifacts, &linkset, &credential, &reference)
                .await
                .unwrap()
        }
    };

    let mut artifacts = s.artifacts.clone();
    artifacts[0].content.extend_from_slice(b"9,3.1\n");
    let report = check(artifacts, s.linkset.clone(), s.credential.clone()).await;
    assert_eq!(
        report.diverged_layer(),
        Some(&ChainLayer::Artifact("readings.csv".into()))
    );

    let mut linkset = s.linkset.clone();
    linkset.links.swap(0, 1);
    let report = check(s.artifacts.clone(), linkset, s.credential.clone()).await;
    assert_eq!(report.diverged_layer(), Some(&ChainLayer::Linkset));

    let other = build_chain(&s.artifacts, DigestAlgorithm::Blake3).unwrap();
    let report = check(s.artifacts.clone(), other, s.credential.clone()).await;
    assert_eq!(report.diverged_layer(), Some(&ChainLayer::CredentialReference));

    s.ledger
        .overwrite(
            &reference.tx_id,
            Digest::compute(b"forged", DigestAlgorithm::Sha256),
        )
        .unwrap();
    let report = check(s.artifacts.clone(), s.linkset.clone(), s.credential.clone()).await;
    assert_eq!(report.diverged_layer(), Some(&ChainLayer::Anchor));
}

#[tokio::test]
async fn test_reference_to_another_credential_diverges_at_anchor() {
    let s = scenario().await;
    let mut builder = CredentialBuilder {
        issuer: Some(s.credential.issuer.clone()),
        subject: Claims::new().with("name", "rainfall").with("value", 9.5),
        issuance_date: Some(epoch()),
        ..Default::default()
    };
    embed_reference(&mut builder, &s.linkset);
    let other = s.world.issuer().issue_from(builder, "keys-1").await.unwrap();

    s.coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .unwrap();
    let foreign = s
        .coordinator
        .anchor_credential(&other, "memory")
        .await
        .unwrap();

    // Both ledger entries are genuine, but the reference names the other one.
    let report = s
        .coordinator
        .verify_chain(&s.artifacts, &s.linkset, &s.credential, &foreign)
        .await
        .unwrap();
    assert_eq!(report.diverged_layer(), Some(&ChainLayer::Anchor));

    // A reference whose recorded digest disagrees with the ledger entry.
    let mut own = s
        .coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .unwrap();
    own.tx_id = foreign.tx_id.clone();
    let report = s
        .coordinator
        .verify_chain(&s.artifacts, &s.linkset, &s.credential, &own)
        .await
        .unwrap();
    assert_eq!(report.diverged_layer(), Some(&ChainLayer::Anchor));
}

#[tokio::test]
async fn test_congested_ledger_surfaces_retryable_error() {
    let s = scenario().await;
    s.ledger.set_congested(true);

    let err = s
        .coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .unwrap_err();
    assert!(matches!(err, AnchorError::Retryable { .. }));
    assert!(err.is_retryable());
    assert!(s.ledger.is_empty());

    // The caller decides when to retry.
    s.ledger.set_congested(false);
    assert!(s
        .coordinator
        .anchor_credential(&s.credential, "memory")
        .await
        .is_ok());
}

#[tokio::test]
async fn test_unregistered_chain_is_terminal() {
    let s = scenario().await;
    let err = s
        .coordinator
        .anchor(&s.linkset.digest, "mainnet")
        .await
        .unwrap_err();
    assert!(matches!(err, AnchorError::UnknownChain(_)));
    assert!(!err.is_retryable());
}
