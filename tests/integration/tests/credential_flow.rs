//! Issue, transport and verify credentials across the identity, crypto and
//! credential crates.

use chrono::Duration;
use tessera_core::{Claims, TrustPolicy};
use tessera_credentials::{
    Credential, FailureKind, IssueOptions, StageStatus, VerificationStage, VerificationWarning,
};
use tessera_crypto::KeyType;
use tessera_identity::TrustAnchor;
use tessera_integration_tests::{epoch, World};

fn rainfall() -> Claims {
    Claims::new().with("name", "rainfall").with("value", 0.5)
}

async fn issue_rainfall(world: &World, key_type: KeyType, with_status: bool) -> Credential {
    let issuer = world.enroll(key_type);
    world
        .trust
        .add_anchor(TrustAnchor::new(issuer.clone()).with_scope(["RainfallCredential"]));
    world
        .issuer()
        .issue(
            rainfall(),
            &issuer,
            "keys-1",
            IssueOptions {
                types: vec!["RainfallCredential".into()],
                expiration: Some(epoch() + Duration::days(365)),
                status: with_status.then(|| world.statuses.allocate("revocation")),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_rainfall_lifecycle() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, true).await;
    let verifier = world.verifier();

    let outcome = verifier.verify(&vc).await;
    assert!(outcome.is_valid(), "{:?}", outcome);
    assert!(outcome.warnings().is_empty());
    assert_eq!(outcome.stages().len(), 5);

    // Two years on, the credential has lapsed.
    world.clock.advance(Duration::days(730));
    assert_eq!(
        verifier.verify(&vc).await.failure(),
        Some((VerificationStage::Temporal, FailureKind::Expired))
    );

    // Back inside the window, revocation takes effect immediately.
    world.clock.set(epoch() + Duration::days(30));
    assert!(verifier.verify(&vc).await.is_valid());
    world
        .statuses
        .revoke(vc.credential_status.as_ref().unwrap().status_list_index)
        .unwrap();
    assert_eq!(
        verifier.verify(&vc).await.failure(),
        Some((VerificationStage::Revocation, FailureKind::Revoked))
    );
}

#[tokio::test]
async fn test_wire_round_trip_verifies() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Secp256k1, false).await;

    let json = vc.to_json_pretty().unwrap();
    let outcome = world.verifier().verify_json(&json).await;
    assert!(outcome.is_valid(), "{:?}", outcome);

    // Revocation is skipped for a credential without a status reference.
    let revocation = outcome
        .stages()
        .iter()
        .find(|s| s.stage == VerificationStage::Revocation)
        .unwrap();
    assert_eq!(revocation.status, StageStatus::Skipped);
}

#[tokio::test]
async fn test_tampered_claim_fails_at_proof() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, false).await;

    let mut value: serde_json::Value = serde_json::from_str(&vc.to_json_pretty().unwrap()).unwrap();
    value["credentialSubject"]["value"] = serde_json::json!(5.0);

    let outcome = world.verifier().verify_json(&value.to_string()).await;
    assert_eq!(
        outcome.failure(),
        Some((VerificationStage::Proof, FailureKind::InvalidSignature))
    );
}

#[tokio::test]
async fn test_unknown_issuer_fails_closed() {
    let world = World::new();
    let stranger = world.enroll(KeyType::Ed25519);
    let vc = world
        .issuer()
        .issue(rainfall(), &stranger, "keys-1", IssueOptions::default())
        .await
        .unwrap();

    let outcome = world.verifier().verify(&vc).await;
    assert_eq!(
        outcome.failure(),
        Some((VerificationStage::IssuerTrust, FailureKind::UntrustedIssuer))
    );

    let skipped = world
        .verifier()
        .with_trust_policy(TrustPolicy::Skip)
        .verify(&vc)
        .await;
    assert!(skipped.is_valid());
    assert_eq!(skipped.warnings(), &[VerificationWarning::TrustCheckSkipped]);
}

#[tokio::test]
async fn test_delegated_issuer_is_trusted() {
    let world = World::new();
    let bureau = world.enroll(KeyType::Ed25519);
    let station = world.enroll(KeyType::Secp256k1);
    world
        .trust
        .add_anchor(TrustAnchor::new(bureau.clone()).with_delegation_depth(1));
    world.trust.add_delegation(&bureau, &station).unwrap();

    let vc = world
        .issuer()
        .issue(rainfall(), &station, "keys-1", IssueOptions::default())
        .await
        .unwrap();
    assert!(world.verifier().verify(&vc).await.is_valid());
}

#[tokio::test]
async fn test_expiration_boundary_is_exclusive() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, false).await;
    let verifier = world.verifier();

    world
        .clock
        .set(epoch() + Duration::days(365) - Duration::seconds(1));
    assert!(verifier.verify(&vc).await.is_valid());

    world.clock.set(epoch() + Duration::days(365));
    assert_eq!(
        verifier.verify(&vc).await.failure(),
        Some((VerificationStage::Temporal, FailureKind::Expired))
    );
}

#[tokio::test]
async fn test_suspension_is_reversible() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, true).await;
    let index = vc.credential_status.as_ref().unwrap().status_list_index;
    let verifier = world.verifier();

    world.statuses.suspend(index).unwrap();
    assert_eq!(
        verifier.verify(&vc).await.failure(),
        Some((VerificationStage::Revocation, FailureKind::Suspended))
    );

    world.statuses.reinstate(index).unwrap();
    assert!(verifier.verify(&vc).await.is_valid());
}

#[tokio::test]
async fn test_status_unknown_without_resolver() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, true).await;

    let verifier = tessera_credentials::CredentialVerifier::new(
        world.resolver.clone(),
        world.trust.clone(),
    )
    .with_clock(world.clock.clone());
    assert_eq!(
        verifier.verify(&vc).await.failure(),
        Some((VerificationStage::Revocation, FailureKind::StatusUnknown))
    );
}

#[tokio::test]
async fn test_added_key_keeps_old_proof_valid() {
    let world = World::new();
    let vc = issue_rainfall(&world, KeyType::Ed25519, false).await;

    // Adding a second key leaves #keys-1 published.
    let extra = tessera_crypto::KeyPair::generate(KeyType::Ed25519).public_key();
    world.manager.add_key(&vc.issuer, &extra).unwrap();
    assert!(world.verifier().verify(&vc).await.is_valid());

    // Revoking #keys-1 leaves the proof without a key.
    world.manager.revoke_method(&vc.issuer, "keys-1").unwrap();
    assert_eq!(
        world.verifier().verify(&vc).await.failure(),
        Some((VerificationStage::Proof, FailureKind::UnresolvableKey))
    );
}
