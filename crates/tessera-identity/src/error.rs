use tessera_core::CoreError;
use tessera_crypto::CryptoError;

/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("DID not found: {0}")]
    DidNotFound(String),

    #[error("duplicate DID: {0}")]
    DuplicateDid(String),

    #[error("verification method not found: {0}")]
    VerificationMethodNotFound(String),

    #[error("duplicate verification method: {0}")]
    DuplicateVerificationMethod(String),

    #[error("invalid DID document: {0}")]
    InvalidDocument(String),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("trust error: {0}")]
    Trust(#[from] TrustError),
}

/// Typed DID resolution failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    #[error("DID not found: {0}")]
    NotFound(String),

    #[error("no resolver registered for DID method: {0}")]
    MethodNotSupported(String),

    #[error("resolver I/O failure: {0}")]
    Io(String),

    #[error("malformed DID or document: {0}")]
    Malformed(String),
}

/// Trust registry failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrustError {
    #[error("no trust anchor reachable for issuer: {0}")]
    NotFound(String),

    #[error("issuer {issuer} is trusted, but not for these credential types")]
    OutOfScope { issuer: String },

    #[error("trust anchor for {issuer} is outside its validity window")]
    AnchorInactive { issuer: String },

    #[error("trust path for {issuer} needs {hops} delegation hops, anchor allows {max_depth}")]
    TrustPathTooLong {
        issuer: String,
        hops: u32,
        max_depth: u32,
    },

    #[error("invalid delegation: {0}")]
    InvalidDelegation(String),
}
