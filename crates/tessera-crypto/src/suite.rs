//! Proof suites.
//!
//! A suite pins a proof type to the key algorithm that may produce it.
//! Suites are looked up by id; nothing is ever inferred from the key.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CryptoError;
use crate::keys::{KeyType, PublicKey};

/// A named signature scheme usable in a credential proof.
pub trait ProofSuite: Send + Sync {
    /// Proof `type` value, e.g. `Ed25519Signature2020`.
    fn id(&self) -> &str;

    /// The only key algorithm this suite accepts.
    fn key_type(&self) -> KeyType;

    /// Verify `signature` over `message`.
    ///
    /// Fails with `UnsupportedAlgorithm` when the key belongs to another
    /// algorithm, before any signature math runs.
    fn verify(
        &self,
        public_key: &PublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoError> {
        if public_key.key_type() != self.key_type() {
            return Err(CryptoError::UnsupportedAlgorithm(format!(
                "suite {} cannot verify with a {} key",
                self.id(),
                public_key.key_type()
            )));
        }
        public_key.verify(message, signature)
    }
}

/// EdDSA over Curve25519.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Signature2020;

impl ProofSuite for Ed25519Signature2020 {
    fn id(&self) -> &str {
        "Ed25519Signature2020"
    }

    fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }
}

/// ECDSA over secp256k1 with SHA-256, 64-byte compact signatures.
#[derive(Debug, Default, Clone, Copy)]
pub struct EcdsaSecp256k1Signature2019;

impl ProofSuite for EcdsaSecp256k1Signature2019 {
    fn id(&self) -> &str {
        "EcdsaSecp256k1Signature2019"
    }

    fn key_type(&self) -> KeyType {
        KeyType::Secp256k1
    }
}

/// Registry of suites keyed by id.
#[derive(Clone, Default)]
pub struct SuiteRegistry {
    suites: HashMap<String, Arc<dyn ProofSuite>>,
}

impl SuiteRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the two built-in suites.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(Ed25519Signature2020));
        registry.register(Arc::new(EcdsaSecp256k1Signature2019));
        registry
    }

    /// Register a suite, replacing any suite with the same id.
    pub fn register(&mut self, suite: Arc<dyn ProofSuite>) {
        let id = suite.id().to_string();
        tracing::debug!(suite = %id, "proof suite registered");
        self.suites.insert(id, suite);
    }

    /// Look up a suite by proof type.
    pub fn get(&self, id: &str) -> Result<Arc<dyn ProofSuite>, CryptoError> {
        self.suites
            .get(id)
            .cloned()
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("proof suite {}", id)))
    }

    /// The registered suite that signs with `key_type`, if any.
    pub fn suite_for_key(&self, key_type: KeyType) -> Option<Arc<dyn ProofSuite>> {
        let mut matching: Vec<_> = self
            .suites
            .values()
            .filter(|s| s.key_type() == key_type)
            .collect();
        // Stable choice when several suites share a key type.
        matching.sort_by(|a, b| a.id().cmp(b.id()));
        matching.first().map(|s| Arc::clone(*s))
    }

    /// Registered suite ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.suites.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for SuiteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRegistry")
            .field("suites", &self.ids())
            .finish()
    }
}
