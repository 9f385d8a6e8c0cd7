use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AnchorError;
use crate::traits::AnchorClient;

/// Anchor clients keyed by chain id.
#[derive(Clone, Default)]
pub struct AnchorRegistry {
    clients: HashMap<String, Arc<dyn AnchorClient>>,
}

impl AnchorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own `chain_id()`, replacing any previous
    /// client for that chain.
    pub fn register(&mut self, client: Arc<dyn AnchorClient>) {
        let chain_id = client.chain_id().to_string();
        tracing::info!(chain_id = %chain_id, "registering anchor client");
        self.clients.insert(chain_id, client);
    }

    pub fn with(mut self, client: Arc<dyn AnchorClient>) -> Self {
        self.register(client);
        self
    }

    pub fn unregister(&mut self, chain_id: &str) -> Option<Arc<dyn AnchorClient>> {
        self.clients.remove(chain_id)
    }

    pub fn client(&self, chain_id: &str) -> Result<Arc<dyn AnchorClient>, AnchorError> {
        self.clients
            .get(chain_id)
            .cloned()
            .ok_or_else(|| AnchorError::UnknownChain(chain_id.to_string()))
    }

    /// Registered chain ids, sorted.
    pub fn chain_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl std::fmt::Debug for AnchorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorRegistry")
            .field("chains", &self.chain_ids())
            .finish()
    }
}
