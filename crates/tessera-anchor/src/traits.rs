use async_trait::async_trait;
use tessera_crypto::Digest;

use crate::error::AnchorError;
use crate::types::{AnchorReference, AnchorStatus};

/// Ledger anchor client interface.
///
/// Each implementation bridges to one ledger, identified by its chain id.
/// Clients only ever receive digests, never the content they describe.
#[async_trait]
pub trait AnchorClient: Send + Sync {
    /// Submit `digest` and return as soon as the ledger accepted it.
    async fn write_digest(&self, digest: &Digest) -> Result<AnchorReference, AnchorError>;

    /// Current finality of a submitted anchor.
    async fn confirmation(&self, reference: &AnchorReference) -> Result<AnchorStatus, AnchorError>;

    /// The digest recorded under `reference`.
    async fn read_digest(&self, reference: &AnchorReference) -> Result<Digest, AnchorError>;

    /// Chain id this client serves (e.g. "memory").
    fn chain_id(&self) -> &str;
}
