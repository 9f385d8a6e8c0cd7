//! Holder presentations checked by verifiers with their own challenges.

use std::sync::Arc;

use chrono::Duration;
use tessera_core::Claims;
use tessera_credentials::{
    Credential, FailureKind, HolderCheck, IssueOptions, Presentation, PresentationBuilder,
    PresentationVerifier,
};
use tessera_crypto::KeyType;
use tessera_identity::TrustAnchor;
use tessera_integration_tests::{epoch, World};

async fn issue_to(world: &World, holder: &tessera_core::Did, name: &str) -> Credential {
    let issuer = world.enroll(KeyType::Ed25519);
    world.trust.add_anchor(TrustAnchor::new(issuer.clone()));
    world
        .issuer()
        .issue(
            Claims::new()
                .with("id", holder.to_string())
                .with("name", name),
            &issuer,
            "keys-1",
            IssueOptions {
                expiration: Some(epoch() + Duration::days(365)),
                status: Some(world.statuses.allocate("revocation")),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_two_issuers_one_presentation() {
    let world = World::new();
    let holder = world.enroll(KeyType::Secp256k1);
    let rainfall = issue_to(&world, &holder, "rainfall").await;
    let station = issue_to(&world, &holder, "station-operator").await;

    let vp = PresentationBuilder {
        holder: Some(holder.clone()),
        credentials: vec![rainfall, station],
        ..Default::default()
    }
    .sign(&world.generator(), "keys-1", "c-1", Some("audit.example"))
    .await
    .unwrap();

    // Over the wire and back.
    let received = Presentation::from_json(&vp.to_json_pretty().unwrap()).unwrap();
    let verifier = PresentationVerifier::new(Arc::new(world.verifier()));
    let outcome = verifier
        .verify(&received, "c-1", Some("audit.example"))
        .await;
    assert!(outcome.is_valid(), "{:?}", outcome);
    assert_eq!(outcome.credentials.len(), 2);
}

#[tokio::test]
async fn test_captured_presentation_replayed_elsewhere() {
    let world = World::new();
    let holder = world.enroll(KeyType::Ed25519);
    let credential = issue_to(&world, &holder, "rainfall").await;

    let vp = PresentationBuilder {
        holder: Some(holder),
        credentials: vec![credential],
        ..Default::default()
    }
    .sign(&world.generator(), "keys-1", "c-1", Some("audit.example"))
    .await
    .unwrap();

    let verifier = PresentationVerifier::new(Arc::new(world.verifier()));

    // A second verifier issued its own challenge.
    let outcome = verifier.verify(&vp, "c-2", Some("audit.example")).await;
    assert!(matches!(
        outcome.holder,
        HolderCheck::Invalid {
            kind: FailureKind::ReplayDetected,
            ..
        }
    ));
    assert!(!outcome.is_valid());

    let outcome = verifier.verify(&vp, "c-1", Some("other.example")).await;
    assert!(matches!(
        outcome.holder,
        HolderCheck::Invalid {
            kind: FailureKind::ReplayDetected,
            ..
        }
    ));
}

#[tokio::test]
async fn test_revoked_credential_inside_valid_presentation() {
    let world = World::new();
    let holder = world.enroll(KeyType::Ed25519);
    let kept = issue_to(&world, &holder, "rainfall").await;
    let revoked = issue_to(&world, &holder, "station-operator").await;
    world
        .statuses
        .revoke(revoked.credential_status.as_ref().unwrap().status_list_index)
        .unwrap();

    let vp = PresentationBuilder {
        holder: Some(holder),
        credentials: vec![kept, revoked],
        ..Default::default()
    }
    .sign(&world.generator(), "keys-1", "c-1", None)
    .await
    .unwrap();

    let outcome = PresentationVerifier::new(Arc::new(world.verifier()))
        .verify(&vp, "c-1", None)
        .await;
    assert_eq!(outcome.holder, HolderCheck::Valid);
    assert!(outcome.credentials[0].is_valid());
    assert_eq!(
        outcome.credentials[1].failure().map(|(_, kind)| kind),
        Some(FailureKind::Revoked)
    );
    assert!(!outcome.is_valid());
}
