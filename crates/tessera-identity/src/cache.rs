use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tessera_core::{Clock, Did, SystemClock};

use crate::did_resolver::DidResolver;
use crate::document::DidDocument;
use crate::error::ResolutionError;

/// Bounded-TTL cache in front of another resolver.
///
/// Only successful resolutions are cached. Entries older than the TTL are
/// re-resolved, so a key rotation becomes visible within one TTL.
pub struct CachingResolver {
    inner: Arc<dyn DidResolver>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: DashMap<String, (DidDocument, DateTime<Utc>)>,
}

impl CachingResolver {
    pub fn new(inner: Arc<dyn DidResolver>, ttl: Duration) -> Self {
        Self::with_clock(inner, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(inner: Arc<dyn DidResolver>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner,
            ttl,
            clock,
            entries: DashMap::new(),
        }
    }

    /// Drop the cached document for `did`.
    pub fn invalidate(&self, did: &Did) -> bool {
        self.entries.remove(did.uri()).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl DidResolver for CachingResolver {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, ResolutionError> {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get(did.uri()) {
            let (doc, fetched_at) = entry.value();
            if now - *fetched_at < self.ttl {
                tracing::debug!(did = %did, "DID resolved from cache");
                return Ok(doc.clone());
            }
        }

        let doc = self.inner.resolve(did).await?;
        self.entries
            .insert(did.uri().to_string(), (doc.clone(), now));
        Ok(doc)
    }
}
