use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tessera_core::config::AnchorConfig;
use tessera_crypto::Digest;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::AnchorError;
use crate::traits::AnchorClient;
use crate::types::{AnchorReference, AnchorStatus};

/// One anchored digest and the block that included it.
#[derive(Debug, Clone, Copy)]
struct LedgerRecord {
    digest: Digest,
    height: u64,
}

/// In-process ledger.
///
/// Blocks are produced by [`InMemoryLedger::mine_block`] or by a background
/// producer. A record counts as confirmed once `confirmation_depth` blocks
/// sit on top of the block that included it. Congestion can be switched on
/// to exercise retry handling.
pub struct InMemoryLedger {
    chain_id: String,
    confirmation_depth: u64,
    height: AtomicU64,
    records: DashMap<String, LedgerRecord>,
    congested: AtomicBool,
}

impl InMemoryLedger {
    /// A ledger where one block on top is enough.
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            confirmation_depth: 1,
            height: AtomicU64::new(0),
            records: DashMap::new(),
            congested: AtomicBool::new(false),
        }
    }

    /// A ledger named after the configured default chain and depth.
    pub fn from_config(config: &AnchorConfig) -> Self {
        Self::new(config.default_chain.clone()).with_confirmation_depth(config.confirmation_depth)
    }

    pub fn with_confirmation_depth(mut self, depth: u64) -> Self {
        self.confirmation_depth = depth;
        self
    }

    /// While congested, submissions fail with a retryable error.
    pub fn set_congested(&self, congested: bool) {
        self.congested.store(congested, Ordering::SeqCst);
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    /// Append one block and return the new height.
    pub fn mine_block(&self) -> u64 {
        let height = self.height.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(chain_id = %self.chain_id, height, "block mined");
        height
    }

    /// Mine a block every `interval` until the handle is aborted.
    pub fn spawn_block_producer(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.mine_block();
            }
        })
    }

    /// Overwrite a stored digest, simulating a corrupted or forged ledger
    /// entry.
    pub fn overwrite(&self, tx_id: &str, digest: Digest) -> Result<(), AnchorError> {
        let mut record = self
            .records
            .get_mut(tx_id)
            .ok_or_else(|| AnchorError::NotFound(tx_id.to_string()))?;
        record.digest = digest;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, reference: &AnchorReference) -> Result<LedgerRecord, AnchorError> {
        if reference.chain_id != self.chain_id {
            return Err(AnchorError::Terminal {
                chain_id: self.chain_id.clone(),
                reason: format!("reference belongs to chain {}", reference.chain_id),
            });
        }
        self.records
            .get(&reference.tx_id)
            .map(|r| *r)
            .ok_or_else(|| AnchorError::NotFound(reference.to_string()))
    }
}

#[async_trait]
impl AnchorClient for InMemoryLedger {
    async fn write_digest(&self, digest: &Digest) -> Result<AnchorReference, AnchorError> {
        if self.congested.load(Ordering::SeqCst) {
            return Err(AnchorError::Retryable {
                chain_id: self.chain_id.clone(),
                reason: "ledger congested".into(),
            });
        }

        let tx_id = format!("tx-{}", Uuid::now_v7().simple());
        // Included in the block after the current head.
        let height = self.height() + 1;
        self.records.insert(
            tx_id.clone(),
            LedgerRecord {
                digest: *digest,
                height,
            },
        );
        tracing::debug!(chain_id = %self.chain_id, tx_id = %tx_id, height, "digest written");

        Ok(AnchorReference {
            chain_id: self.chain_id.clone(),
            tx_id,
            digest: *digest,
            submitted_at: Utc::now(),
        })
    }

    async fn confirmation(&self, reference: &AnchorReference) -> Result<AnchorStatus, AnchorError> {
        let record = self.record(reference)?;
        let head = self.height();
        let confirmations = if head >= record.height {
            head - record.height + 1
        } else {
            0
        };
        if confirmations >= self.confirmation_depth {
            Ok(AnchorStatus::Confirmed { confirmations })
        } else {
            Ok(AnchorStatus::Pending {
                confirmations,
                required: self.confirmation_depth,
            })
        }
    }

    async fn read_digest(&self, reference: &AnchorReference) -> Result<Digest, AnchorError> {
        Ok(self.record(reference)?.digest)
    }

    fn chain_id(&self) -> &str {
        &self.chain_id
    }
}
