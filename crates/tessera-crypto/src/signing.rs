use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::CryptoError;
use crate::keys::{KeyPair, KeyType, PublicKey};

/// Signing capability consumed by issuers.
///
/// Keys are addressed by an opaque handle; private material never leaves
/// the implementation. Remote KMS or HSM backends implement this trait.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Sign `message` with the key behind `key_handle`.
    async fn sign(&self, key_handle: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Public half of the key behind `key_handle`.
    async fn public_key_of(&self, key_handle: &str) -> Result<PublicKey, CryptoError>;
}

/// Sign a message with a local key pair.
pub fn sign(message: &[u8], keypair: &KeyPair) -> Vec<u8> {
    keypair.sign(message)
}

/// Verify a signature against a public key.
pub fn verify(message: &[u8], signature: &[u8], pubkey: &PublicKey) -> Result<(), CryptoError> {
    pubkey.verify(message, signature)
}

/// In-process keyring backed by a concurrent map.
#[derive(Debug, Default)]
pub struct LocalKeyring {
    keys: DashMap<String, KeyPair>,
}

impl LocalKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a key under `handle`, replacing any previous key.
    pub fn insert(&self, handle: impl Into<String>, keypair: KeyPair) -> PublicKey {
        let handle = handle.into();
        let public_key = keypair.public_key();
        tracing::debug!(handle = %handle, key_type = %keypair.key_type(), "key stored");
        self.keys.insert(handle, keypair);
        public_key
    }

    /// Generate a fresh key under `handle` and return its public half.
    pub fn generate(&self, handle: impl Into<String>, key_type: KeyType) -> PublicKey {
        self.insert(handle, KeyPair::generate(key_type))
    }

    pub fn remove(&self, handle: &str) -> bool {
        self.keys.remove(handle).is_some()
    }

    pub fn contains(&self, handle: &str) -> bool {
        self.keys.contains_key(handle)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[async_trait]
impl Signer for LocalKeyring {
    async fn sign(&self, key_handle: &str, message: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let keypair = self
            .keys
            .get(key_handle)
            .ok_or_else(|| CryptoError::KeyNotFound(key_handle.to_string()))?;
        Ok(keypair.sign(message))
    }

    async fn public_key_of(&self, key_handle: &str) -> Result<PublicKey, CryptoError> {
        self.keys
            .get(key_handle)
            .map(|kp| kp.public_key())
            .ok_or_else(|| CryptoError::KeyNotFound(key_handle.to_string()))
    }
}
