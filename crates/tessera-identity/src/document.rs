use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessera_core::{truncate_to_seconds, Did, DidUrl};
use tessera_crypto::{CryptoError, KeyType, PublicKey};

use crate::error::IdentityError;

/// A verification method within a DID Document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    /// Full DID URL, e.g. `did:local:abc#keys-1`.
    pub id: String,
    /// e.g. `Ed25519VerificationKey2020`.
    #[serde(rename = "type")]
    pub method_type: String,
    /// The DID that controls this verification method.
    pub controller: Did,
    /// Multibase (base58btc) multicodec-tagged public key.
    pub public_key_multibase: String,
}

impl VerificationMethod {
    /// Build a method for `key` under `controller#fragment`.
    pub fn new(controller: &Did, fragment: &str, key: &PublicKey) -> Self {
        Self {
            id: controller.with_fragment(fragment).to_string(),
            method_type: key.key_type().verification_method_type().to_string(),
            controller: controller.clone(),
            public_key_multibase: key.to_multibase(),
        }
    }

    /// The fragment part of the id, without `#`.
    pub fn fragment(&self) -> &str {
        self.id.rsplit_once('#').map(|(_, f)| f).unwrap_or_default()
    }

    /// Key algorithm declared by `type`, if recognised.
    pub fn key_type(&self) -> Option<KeyType> {
        KeyType::from_verification_method_type(&self.method_type)
    }

    /// Decode the published key and check it agrees with the declared type.
    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        let key = PublicKey::from_multibase(&self.public_key_multibase)?;
        match self.key_type() {
            Some(declared) if declared == key.key_type() => Ok(key),
            Some(declared) => Err(CryptoError::InvalidKey(format!(
                "{} declares {} but publishes a {} key",
                self.id,
                declared,
                key.key_type()
            ))),
            None => Err(CryptoError::UnsupportedAlgorithm(self.method_type.clone())),
        }
    }
}

/// Resolved form of a DID: an ordered list of verification methods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: Did,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl DidDocument {
    /// Create an empty document for `id`.
    pub fn new(id: Did) -> Self {
        let now = truncate_to_seconds(Utc::now());
        Self {
            id,
            verification_method: Vec::new(),
            created: now,
            updated: now,
        }
    }

    /// Create a document with a single key under `fragment`.
    pub fn with_key(id: Did, fragment: &str, key: &PublicKey) -> Self {
        let mut doc = Self::new(id);
        doc.verification_method
            .push(VerificationMethod::new(&doc.id, fragment, key));
        doc
    }

    /// Append a verification method. Fragments are unique within a document.
    pub fn add_verification_method(
        &mut self,
        fragment: &str,
        key: &PublicKey,
    ) -> Result<DidUrl, IdentityError> {
        if self.find_method(fragment).is_some() {
            return Err(IdentityError::DuplicateVerificationMethod(
                self.id.with_fragment(fragment).to_string(),
            ));
        }
        let vm = VerificationMethod::new(&self.id, fragment, key);
        self.verification_method.push(vm);
        self.touch();
        Ok(self.id.with_fragment(fragment))
    }

    /// Remove the method with `fragment`, returning it.
    pub fn remove_verification_method(&mut self, fragment: &str) -> Option<VerificationMethod> {
        let idx = self
            .verification_method
            .iter()
            .position(|vm| vm.fragment() == fragment)?;
        let removed = self.verification_method.remove(idx);
        self.touch();
        Some(removed)
    }

    /// Find a verification method by fragment.
    pub fn find_method(&self, fragment: &str) -> Option<&VerificationMethod> {
        let fragment = fragment.trim_start_matches('#');
        self.verification_method
            .iter()
            .find(|vm| vm.fragment() == fragment)
    }

    /// Find a method by full DID URL. URLs pointing into another DID's
    /// document never match, even when the fragment does.
    pub fn find_by_url(&self, url: &DidUrl) -> Option<&VerificationMethod> {
        if url.did() != &self.id {
            return None;
        }
        self.find_method(url.fragment())
            .filter(|vm| vm.controller == self.id)
    }

    /// Structural checks applied to every resolved document.
    pub fn validate(&self) -> Result<(), IdentityError> {
        for vm in &self.verification_method {
            let url = DidUrl::parse(&vm.id)
                .map_err(|e| IdentityError::InvalidDocument(e.to_string()))?;
            if url.did() != &self.id {
                return Err(IdentityError::InvalidDocument(format!(
                    "verification method {} does not belong to {}",
                    vm.id, self.id
                )));
            }
        }
        Ok(())
    }

    fn touch(&mut self) {
        self.updated = truncate_to_seconds(Utc::now());
    }
}
