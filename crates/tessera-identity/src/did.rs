use dashmap::DashMap;
use tessera_core::{Did, DidUrl};
use tessera_crypto::PublicKey;

use crate::document::DidDocument;
use crate::error::IdentityError;

struct Entry {
    document: DidDocument,
    /// Next `keys-N` index. Never reused, so a rotated-out fragment cannot
    /// come back pointing at a different key.
    next_key: u32,
}

/// Manages DID creation, key rotation and storage for locally controlled
/// identifiers.
///
/// Uses an in-memory `DashMap` as the document store.
pub struct DidManager {
    /// DID URI -> document
    store: DashMap<String, Entry>,
}

impl DidManager {
    /// Create a new, empty DID manager.
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Create a new DID under `method` for `public_key`.
    ///
    /// The DID format is `did:<method>:<bs58 of the public key>` and the
    /// key is published as `#keys-1`.
    pub fn create_did(&self, method: &str, public_key: &PublicKey) -> Result<Did, IdentityError> {
        let did = Did::from_parts(method, &bs58::encode(public_key.as_bytes()).into_string())?;

        if self.store.contains_key(did.uri()) {
            return Err(IdentityError::DuplicateDid(did.to_string()));
        }

        let document = DidDocument::with_key(did.clone(), "keys-1", public_key);
        self.store.insert(
            did.uri().to_string(),
            Entry {
                document,
                next_key: 2,
            },
        );

        tracing::info!(did = %did, key_type = %public_key.key_type(), "DID created");
        Ok(did)
    }

    /// Resolve a DID to its current document.
    pub fn resolve_did(&self, did: &Did) -> Option<DidDocument> {
        self.store.get(did.uri()).map(|entry| entry.document.clone())
    }

    /// Publish an additional key, returning its DID URL.
    pub fn add_key(&self, did: &Did, public_key: &PublicKey) -> Result<DidUrl, IdentityError> {
        let mut entry = self
            .store
            .get_mut(did.uri())
            .ok_or_else(|| IdentityError::DidNotFound(did.to_string()))?;
        let fragment = format!("keys-{}", entry.next_key);
        let url = entry.document.add_verification_method(&fragment, public_key)?;
        entry.next_key += 1;
        tracing::info!(did = %did, method = %url, "verification method added");
        Ok(url)
    }

    /// Replace the key under `old_fragment` with `new_key`.
    ///
    /// The new key gets a fresh fragment; proofs made with the old key stop
    /// resolving as soon as this returns.
    pub fn rotate_key(
        &self,
        did: &Did,
        old_fragment: &str,
        new_key: &PublicKey,
    ) -> Result<DidUrl, IdentityError> {
        let mut entry = self
            .store
            .get_mut(did.uri())
            .ok_or_else(|| IdentityError::DidNotFound(did.to_string()))?;
        if entry.document.find_method(old_fragment).is_none() {
            return Err(IdentityError::VerificationMethodNotFound(
                did.with_fragment(old_fragment).to_string(),
            ));
        }
        let fragment = format!("keys-{}", entry.next_key);
        let url = entry.document.add_verification_method(&fragment, new_key)?;
        entry.next_key += 1;
        entry.document.remove_verification_method(old_fragment);
        tracing::info!(did = %did, old = %old_fragment, new = %url, "key rotated");
        Ok(url)
    }

    /// Withdraw a verification method without replacing it.
    pub fn revoke_method(&self, did: &Did, fragment: &str) -> Result<(), IdentityError> {
        let mut entry = self
            .store
            .get_mut(did.uri())
            .ok_or_else(|| IdentityError::DidNotFound(did.to_string()))?;
        entry
            .document
            .remove_verification_method(fragment)
            .ok_or_else(|| {
                IdentityError::VerificationMethodNotFound(did.with_fragment(fragment).to_string())
            })?;
        tracing::info!(did = %did, fragment = %fragment, "verification method revoked");
        Ok(())
    }

    /// Replace a stored document wholesale.
    pub fn update_document(&self, doc: DidDocument) -> Result<(), IdentityError> {
        doc.validate()?;
        let mut entry = self
            .store
            .get_mut(doc.id.uri())
            .ok_or_else(|| IdentityError::DidNotFound(doc.id.to_string()))?;
        entry.document = doc;
        Ok(())
    }

    /// Store a document published elsewhere, e.g. one read from disk.
    pub fn import_document(&self, doc: DidDocument) -> Result<(), IdentityError> {
        doc.validate()?;
        if self.store.contains_key(doc.id.uri()) {
            return Err(IdentityError::DuplicateDid(doc.id.to_string()));
        }
        let next_key = doc
            .verification_method
            .iter()
            .filter_map(|vm| vm.fragment().strip_prefix("keys-")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        tracing::debug!(did = %doc.id, "DID document imported");
        self.store
            .insert(doc.id.uri().to_string(), Entry { document: doc, next_key });
        Ok(())
    }

    /// Remove a DID from the store.
    pub fn remove_did(&self, did: &Did) -> Option<DidDocument> {
        self.store.remove(did.uri()).map(|(_, entry)| entry.document)
    }

    /// Get the number of DIDs in the store.
    pub fn count(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// List all stored DID URIs.
    pub fn list_dids(&self) -> Vec<String> {
        self.store.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for DidManager {
    fn default() -> Self {
        Self::new()
    }
}
