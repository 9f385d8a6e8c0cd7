use tessera_core::CoreError;
use tessera_crypto::CryptoError;
use tessera_identity::IdentityError;

/// Credential system errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credential structure: {0}")]
    InvalidStructure(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("proof error: {0}")]
    Proof(#[from] ProofError),

    #[error("status error: {0}")]
    Status(#[from] StatusError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CredentialError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Proof generation and verification failures. Each rejection reason is its
/// own variant so callers never see a bare "invalid".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    /// The verification method could not be resolved to a key.
    #[error("unresolvable key {method}: {reason}")]
    UnresolvableKey { method: String, reason: String },

    /// The verification method belongs to a different DID than the one the
    /// proof is attributed to, or the signer holds a different key.
    #[error("key binding mismatch: {0}")]
    KeyBindingMismatch(String),

    /// The proof suite does not match the resolved key's type.
    #[error("suite {suite} cannot be used with a {key_type} key")]
    SuiteMismatch { suite: String, key_type: String },

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("unsupported proof suite: {0}")]
    UnsupportedSuite(String),

    #[error("malformed proof: {0}")]
    Malformed(String),

    /// The signer capability returned an error.
    #[error("signer failure: {0}")]
    Signer(String),
}

impl ProofError {
    pub(crate) fn unresolvable(method: impl Into<String>, reason: impl ToString) -> Self {
        Self::UnresolvableKey {
            method: method.into(),
            reason: reason.to_string(),
        }
    }
}

/// Status lookups that did not produce an answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusError {
    #[error("status source unreachable: {0}")]
    Unreachable(String),

    #[error("unknown status list: {0}")]
    UnknownList(String),

    #[error("status index not allocated: {0}")]
    UnknownIndex(u64),

    #[error("invalid status transition: {0}")]
    Transition(String),
}
