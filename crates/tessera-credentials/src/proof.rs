//! Detachable proofs.
//!
//! The signing input is
//! `SHA-256(canonical(proof options)) || SHA-256(canonical(document - proof))`,
//! where the proof options are the proof block without `proofValue`. Hashing
//! the options binds the suite, creation time, verification method,
//! challenge and domain into the signature.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_core::{Clock, Did, DidUrl, SystemClock};
use tessera_crypto::{
    decode_multibase, encode_multibase, CanonicalBytes, Digest, DigestAlgorithm, PublicKey,
    Signer, SuiteRegistry,
};
use tessera_identity::DidResolver;

use crate::error::ProofError;

/// Purpose of a credential proof.
pub const ASSERTION_METHOD: &str = "assertionMethod";
/// Purpose of a holder-binding proof.
pub const AUTHENTICATION: &str = "authentication";

/// A detachable proof block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Suite id, e.g. `Ed25519Signature2020`.
    #[serde(rename = "type")]
    pub proof_type: String,
    pub created: DateTime<Utc>,
    /// DID URL of the signing key.
    pub verification_method: String,
    pub proof_purpose: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Multibase (base58btc) signature.
    #[serde(default)]
    pub proof_value: String,
}

impl Proof {
    /// The verification method as a parsed DID URL.
    pub fn method_url(&self) -> Result<DidUrl, ProofError> {
        DidUrl::parse(&self.verification_method).map_err(|e| ProofError::Malformed(e.to_string()))
    }

    /// Raw signature bytes.
    pub fn signature_bytes(&self) -> Result<Vec<u8>, ProofError> {
        if self.proof_value.is_empty() {
            return Err(ProofError::Malformed("empty proofValue".into()));
        }
        decode_multibase(&self.proof_value).map_err(|e| ProofError::Malformed(e.to_string()))
    }
}

/// Per-proof settings chosen by the caller.
#[derive(Debug, Clone)]
pub struct ProofOptions {
    pub purpose: String,
    pub challenge: Option<String>,
    pub domain: Option<String>,
}

impl Default for ProofOptions {
    fn default() -> Self {
        Self {
            purpose: ASSERTION_METHOD.to_string(),
            challenge: None,
            domain: None,
        }
    }
}

impl ProofOptions {
    /// Options for a holder-binding proof tied to a verifier's challenge.
    pub fn authentication(challenge: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            purpose: AUTHENTICATION.to_string(),
            challenge: Some(challenge.into()),
            domain,
        }
    }
}

/// Compute the bytes a suite signs for `document` under `proof`.
pub fn signing_input<T>(document: &T, proof: &Proof) -> Result<Vec<u8>, ProofError>
where
    T: Serialize + ?Sized,
{
    let options = CanonicalBytes::excluding(proof, &["proofValue"])
        .map_err(|e| ProofError::Malformed(e.to_string()))?;
    let body = CanonicalBytes::excluding(document, &["proof"])
        .map_err(|e| ProofError::Malformed(e.to_string()))?;

    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(Digest::of_canonical(&options, DigestAlgorithm::Sha256).as_bytes());
    input.extend_from_slice(Digest::of_canonical(&body, DigestAlgorithm::Sha256).as_bytes());
    Ok(input)
}

/// Produces proofs with an external signer.
pub struct ProofGenerator {
    signer: Arc<dyn Signer>,
    resolver: Arc<dyn DidResolver>,
    suites: SuiteRegistry,
    clock: Arc<dyn Clock>,
}

impl ProofGenerator {
    pub fn new(signer: Arc<dyn Signer>, resolver: Arc<dyn DidResolver>) -> Self {
        Self {
            signer,
            resolver,
            suites: SuiteRegistry::with_defaults(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_suites(mut self, suites: SuiteRegistry) -> Self {
        self.suites = suites;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Sign `document` with the key published under `controller#fragment`.
    ///
    /// The signer is addressed by the full DID URL. The signer's key must be
    /// the one the controller's document publishes under that fragment.
    pub async fn create_proof<T>(
        &self,
        document: &T,
        controller: &Did,
        fragment: &str,
        options: ProofOptions,
    ) -> Result<Proof, ProofError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let url = controller.with_fragment(fragment);
        let method = url.to_string();

        let doc = self
            .resolver
            .resolve(controller)
            .await
            .map_err(|e| ProofError::unresolvable(&method, e))?;
        let vm = doc.find_by_url(&url).ok_or_else(|| {
            ProofError::unresolvable(&method, "verification method not in DID document")
        })?;
        let published = vm
            .public_key()
            .map_err(|e| ProofError::unresolvable(&method, e))?;

        let signer_key = self
            .signer
            .public_key_of(&method)
            .await
            .map_err(|e| ProofError::Signer(e.to_string()))?;
        if signer_key != published {
            return Err(ProofError::KeyBindingMismatch(format!(
                "signer key for {} differs from the published key",
                method
            )));
        }

        let suite = self
            .suites
            .suite_for_key(signer_key.key_type())
            .ok_or_else(|| ProofError::UnsupportedSuite(signer_key.key_type().to_string()))?;

        let mut proof = Proof {
            proof_type: suite.id().to_string(),
            created: self.clock.now(),
            verification_method: method.clone(),
            proof_purpose: options.purpose,
            challenge: options.challenge,
            domain: options.domain,
            proof_value: String::new(),
        };

        let input = signing_input(document, &proof)?;
        let signature = self
            .signer
            .sign(&method, &input)
            .await
            .map_err(|e| ProofError::Signer(e.to_string()))?;
        proof.proof_value = encode_multibase(&signature);

        tracing::debug!(method = %method, suite = %proof.proof_type, "proof created");
        Ok(proof)
    }
}

/// Checks proofs against keys resolved at verification time.
#[derive(Clone)]
pub struct ProofVerifier {
    resolver: Arc<dyn DidResolver>,
    suites: SuiteRegistry,
}

impl ProofVerifier {
    pub fn new(resolver: Arc<dyn DidResolver>) -> Self {
        Self {
            resolver,
            suites: SuiteRegistry::with_defaults(),
        }
    }

    pub fn with_suites(mut self, suites: SuiteRegistry) -> Self {
        self.suites = suites;
        self
    }

    /// Resolve the key named by `proof`, requiring it to belong to
    /// `controller`'s current document.
    pub async fn resolve_key(
        &self,
        proof: &Proof,
        controller: &Did,
    ) -> Result<PublicKey, ProofError> {
        let url = proof.method_url()?;
        if url.did() != controller {
            return Err(ProofError::KeyBindingMismatch(format!(
                "{} does not belong to {}",
                proof.verification_method, controller
            )));
        }

        let doc = self
            .resolver
            .resolve(controller)
            .await
            .map_err(|e| ProofError::unresolvable(&proof.verification_method, e))?;
        let vm = doc.find_by_url(&url).ok_or_else(|| {
            ProofError::unresolvable(
                &proof.verification_method,
                "verification method not in current DID document",
            )
        })?;
        vm.public_key()
            .map_err(|e| ProofError::unresolvable(&proof.verification_method, e))
    }

    /// Check suite/key agreement and the signature itself.
    pub fn check_signature<T>(
        &self,
        document: &T,
        proof: &Proof,
        key: &PublicKey,
    ) -> Result<(), ProofError>
    where
        T: Serialize + ?Sized,
    {
        let suite = self
            .suites
            .get(&proof.proof_type)
            .map_err(|_| ProofError::UnsupportedSuite(proof.proof_type.clone()))?;
        if suite.key_type() != key.key_type() {
            return Err(ProofError::SuiteMismatch {
                suite: proof.proof_type.clone(),
                key_type: key.key_type().to_string(),
            });
        }

        let signature = proof.signature_bytes()?;
        let input = signing_input(document, proof)?;
        suite
            .verify(key, &input, &signature)
            .map_err(|e| ProofError::InvalidSignature(e.to_string()))
    }

    /// Resolve, then check. Pipelines that overlap resolution with other
    /// lookups call the two halves separately.
    pub async fn verify<T>(
        &self,
        document: &T,
        proof: &Proof,
        controller: &Did,
    ) -> Result<(), ProofError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let key = self.resolve_key(proof, controller).await?;
        self.check_signature(document, proof, &key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::Claims;
    use tessera_crypto::{KeyPair, KeyType, LocalKeyring};
    use tessera_identity::{DidManager, LocalDidMethod};

    struct Fixture {
        manager: Arc<DidManager>,
        keyring: Arc<LocalKeyring>,
        generator: ProofGenerator,
        verifier: ProofVerifier,
        did: Did,
    }

    fn fixture(key_type: KeyType) -> Fixture {
        let manager = Arc::new(DidManager::new());
        let keyring = Arc::new(LocalKeyring::new());
        let kp = KeyPair::generate(key_type);
        let did = manager.create_did("local", &kp.public_key()).unwrap();
        keyring.insert(did.with_fragment("keys-1").to_string(), kp);

        let resolver: Arc<dyn DidResolver> = Arc::new(LocalDidMethod::new(manager.clone()));
        Fixture {
            generator: ProofGenerator::new(keyring.clone(), resolver.clone()),
            verifier: ProofVerifier::new(resolver),
            manager,
            keyring,
            did,
        }
    }

    fn document() -> serde_json::Value {
        serde_json::json!({
            "id": "urn:test:1",
            "credentialSubject": Claims::new().with("name", "rainfall").with("value", 0.5),
        })
    }

    #[tokio::test]
    async fn test_roundtrip_both_suites() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1] {
            let f = fixture(key_type);
            let doc = document();
            let proof = f
                .generator
                .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
                .await
                .unwrap();
            assert!(proof.proof_value.starts_with('z'));
            assert_eq!(proof.proof_purpose, ASSERTION_METHOD);
            f.verifier.verify(&doc, &proof, &f.did).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_suite_follows_key_type() {
        let f = fixture(KeyType::Secp256k1);
        let proof = f
            .generator
            .create_proof(&document(), &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        assert_eq!(proof.proof_type, "EcdsaSecp256k1Signature2019");
    }

    #[tokio::test]
    async fn test_signature_ignores_embedded_proof_field() {
        let f = fixture(KeyType::Ed25519);
        let mut doc = document();
        let proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        doc["proof"] = serde_json::to_value(&proof).unwrap();
        f.verifier.verify(&doc, &proof, &f.did).await.unwrap();
    }

    #[tokio::test]
    async fn test_tampered_document() {
        let f = fixture(KeyType::Ed25519);
        let mut doc = document();
        let proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        doc["credentialSubject"]["value"] = serde_json::json!(0.6);
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_tampered_challenge() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let mut proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::authentication("nonce-1", None))
            .await
            .unwrap();
        proof.challenge = Some("nonce-2".into());
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_method_of_other_did() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        let other = Did::new("did:local:someone-else").unwrap();
        let result = f.verifier.verify(&doc, &proof, &other).await;
        assert!(matches!(result, Err(ProofError::KeyBindingMismatch(_))));
    }

    #[tokio::test]
    async fn test_suite_mismatch() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let mut proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        proof.proof_type = "EcdsaSecp256k1Signature2019".into();
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::SuiteMismatch { .. })));
    }

    #[tokio::test]
    async fn test_unknown_suite() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let mut proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        proof.proof_type = "RsaSignature2018".into();
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::UnsupportedSuite(_))));
    }

    #[tokio::test]
    async fn test_rotated_key_is_unresolvable() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        f.manager
            .rotate_key(&f.did, "keys-1", &KeyPair::generate(KeyType::Ed25519).public_key())
            .unwrap();
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::UnresolvableKey { .. })));
    }

    #[tokio::test]
    async fn test_missing_fragment_at_issuance() {
        let f = fixture(KeyType::Ed25519);
        let result = f
            .generator
            .create_proof(&document(), &f.did, "keys-7", ProofOptions::default())
            .await;
        assert!(matches!(result, Err(ProofError::UnresolvableKey { .. })));
    }

    #[tokio::test]
    async fn test_signer_holds_other_key() {
        let f = fixture(KeyType::Ed25519);
        f.keyring.insert(
            f.did.with_fragment("keys-1").to_string(),
            KeyPair::generate(KeyType::Ed25519),
        );
        let result = f
            .generator
            .create_proof(&document(), &f.did, "keys-1", ProofOptions::default())
            .await;
        assert!(matches!(result, Err(ProofError::KeyBindingMismatch(_))));
    }

    #[tokio::test]
    async fn test_signer_failure_propagated() {
        let f = fixture(KeyType::Ed25519);
        f.keyring.remove(&f.did.with_fragment("keys-1").to_string());
        let result = f
            .generator
            .create_proof(&document(), &f.did, "keys-1", ProofOptions::default())
            .await;
        assert!(matches!(result, Err(ProofError::Signer(_))));
    }

    #[tokio::test]
    async fn test_empty_proof_value() {
        let f = fixture(KeyType::Ed25519);
        let doc = document();
        let mut proof = f
            .generator
            .create_proof(&doc, &f.did, "keys-1", ProofOptions::default())
            .await
            .unwrap();
        proof.proof_value.clear();
        let result = f.verifier.verify(&doc, &proof, &f.did).await;
        assert!(matches!(result, Err(ProofError::Malformed(_))));
    }
}
