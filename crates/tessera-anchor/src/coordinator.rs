use std::sync::Arc;
use std::time::Duration;
use tessera_core::config::AnchorConfig;
use tessera_credentials::Credential;
use tessera_crypto::{Digest, DigestAlgorithm};

use crate::chain::{check_anchor, verify_links, Artifact, ChainLayer, ChainReport, Linkset};
use crate::error::AnchorError;
use crate::registry::AnchorRegistry;
use crate::types::{AnchorReference, AnchorStatus};

/// Submits digests to ledgers and checks anchored chains.
///
/// Submission returns once the ledger accepted the digest; finality is
/// observed separately through [`AnchorCoordinator::poll`] or
/// [`AnchorCoordinator::await_confirmation`]. Failures are returned as-is
/// and never retried here.
pub struct AnchorCoordinator {
    registry: Arc<AnchorRegistry>,
    algorithm: DigestAlgorithm,
    poll_interval: Duration,
    confirmation_timeout: Duration,
}

impl AnchorCoordinator {
    pub fn new(registry: Arc<AnchorRegistry>) -> Self {
        Self::from_config(registry, &AnchorConfig::default())
    }

    pub fn from_config(registry: Arc<AnchorRegistry>, config: &AnchorConfig) -> Self {
        Self {
            registry,
            algorithm: DigestAlgorithm::Sha256,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            confirmation_timeout: Duration::from_secs(config.confirmation_timeout_secs),
        }
    }

    /// Algorithm used when digesting credentials for anchoring.
    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.confirmation_timeout = timeout;
        self
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    /// Submit a digest to `chain_id`.
    pub async fn anchor(
        &self,
        digest: &Digest,
        chain_id: &str,
    ) -> Result<AnchorReference, AnchorError> {
        let client = self.registry.client(chain_id)?;
        match client.write_digest(digest).await {
            Ok(reference) => {
                tracing::info!(
                    chain_id = %chain_id,
                    tx_id = %reference.tx_id,
                    digest = %digest,
                    "anchor submitted"
                );
                Ok(reference)
            }
            Err(e) => {
                tracing::warn!(
                    chain_id = %chain_id,
                    retryable = e.is_retryable(),
                    error = %e,
                    "anchor submission failed"
                );
                Err(e)
            }
        }
    }

    /// Anchor the digest of a signed credential, proof included.
    pub async fn anchor_credential(
        &self,
        credential: &Credential,
        chain_id: &str,
    ) -> Result<AnchorReference, AnchorError> {
        if !credential.is_signed() {
            return Err(AnchorError::InvalidChain(format!(
                "credential {} is not signed",
                credential.id
            )));
        }
        let digest = credential.digest(self.algorithm)?;
        self.anchor(&digest, chain_id).await
    }

    /// Current finality of `reference`.
    pub async fn poll(&self, reference: &AnchorReference) -> Result<AnchorStatus, AnchorError> {
        self.registry
            .client(&reference.chain_id)?
            .confirmation(reference)
            .await
    }

    /// Poll until the anchor is confirmed or the configured timeout passes.
    pub async fn await_confirmation(
        &self,
        reference: &AnchorReference,
    ) -> Result<AnchorStatus, AnchorError> {
        let client = self.registry.client(&reference.chain_id)?;
        let wait = async {
            let period = self.poll_interval.max(Duration::from_millis(1));
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                match client.confirmation(reference).await {
                    Ok(status) if status.is_confirmed() => return Ok(status),
                    Ok(status) => {
                        tracing::debug!(anchor = %reference, status = %status, "anchor pending")
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        match tokio::time::timeout(self.confirmation_timeout, wait).await {
            Ok(Ok(status)) => {
                tracing::info!(anchor = %reference, status = %status, "anchor confirmed");
                Ok(status)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AnchorError::ConfirmationTimeout(self.confirmation_timeout)),
        }
    }

    /// The digest the ledger holds under `reference`.
    pub async fn read_anchor(&self, reference: &AnchorReference) -> Result<Digest, AnchorError> {
        self.registry
            .client(&reference.chain_id)?
            .read_digest(reference)
            .await
    }

    /// Recompute every digest from the artifacts up and compare each with
    /// the reference stored one layer above, ending with the ledger.
    pub async fn verify_chain(
        &self,
        artifacts: &[Artifact],
        linkset: &Linkset,
        credential: &Credential,
        reference: &AnchorReference,
    ) -> Result<ChainReport, AnchorError> {
        let local = verify_links(artifacts, linkset, credential)?;
        if !local.is_intact() {
            return Ok(local);
        }

        // The reference must name this credential, and the ledger must hold
        // the digest the reference recorded.
        let report = check_anchor(credential, &reference.digest)?;
        if !report.is_intact() {
            return Ok(report);
        }
        let anchored = self.read_anchor(reference).await?;
        if anchored != reference.digest {
            return Ok(ChainReport::diverged(
                ChainLayer::Anchor,
                &reference.digest,
                anchored,
            ));
        }

        tracing::debug!(
            anchor = %reference,
            credential_id = %credential.id,
            "digest chain intact"
        );
        Ok(ChainReport::Intact)
    }
}
