use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tessera_crypto::Digest;

/// Where a digest was written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorReference {
    pub chain_id: String,
    /// Ledger transaction id.
    pub tx_id: String,
    /// The digest submitted in that transaction.
    pub digest: Digest,
    pub submitted_at: DateTime<Utc>,
}

impl fmt::Display for AnchorReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chain_id, self.tx_id)
    }
}

/// Finality of a submitted anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum AnchorStatus {
    Pending { confirmations: u64, required: u64 },
    Confirmed { confirmations: u64 },
}

impl AnchorStatus {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }
}

impl fmt::Display for AnchorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending {
                confirmations,
                required,
            } => write!(f, "pending ({}/{})", confirmations, required),
            Self::Confirmed { confirmations } => write!(f, "confirmed ({})", confirmations),
        }
    }
}
