use std::time::Duration;

use tessera_crypto::CryptoError;

/// Anchoring errors.
///
/// Callers decide whether to retry; nothing in this crate retries on its
/// own. Use [`AnchorError::is_retryable`] to tell the two families apart.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    /// Transient ledger condition such as congestion or a dropped connection.
    #[error("retryable anchor failure on {chain_id}: {reason}")]
    Retryable { chain_id: String, reason: String },

    /// The ledger rejected the request and will keep rejecting it.
    #[error("terminal anchor failure on {chain_id}: {reason}")]
    Terminal { chain_id: String, reason: String },

    #[error("no anchor client registered for chain {0}")]
    UnknownChain(String),

    #[error("anchor not found: {0}")]
    NotFound(String),

    #[error("anchor not confirmed within {0:?}")]
    ConfirmationTimeout(Duration),

    #[error("invalid digest chain: {0}")]
    InvalidChain(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl AnchorError {
    /// Whether the same request may succeed if submitted again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. } | Self::ConfirmationTimeout(_))
    }
}
