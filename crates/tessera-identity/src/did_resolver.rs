use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tessera_core::Did;

use crate::did::DidManager;
use crate::document::DidDocument;
use crate::error::ResolutionError;

/// Trait for resolving DIDs to their documents.
///
/// One implementation per DID method; see [`ResolverRegistry`].
#[async_trait]
pub trait DidResolver: Send + Sync {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, ResolutionError>;
}

/// Resolves DIDs from the local in-memory [`DidManager`].
pub struct LocalDidMethod {
    manager: Arc<DidManager>,
}

impl LocalDidMethod {
    /// Method tag this resolver is normally registered under.
    pub const METHOD: &'static str = "local";

    pub fn new(manager: Arc<DidManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl DidResolver for LocalDidMethod {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, ResolutionError> {
        self.manager
            .resolve_did(did)
            .ok_or_else(|| ResolutionError::NotFound(did.to_string()))
    }
}

/// Dispatches resolution by DID method tag.
///
/// An identifier whose method has no registered resolver fails with
/// `MethodNotSupported`; there is no fallback to other methods.
#[derive(Clone, Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Arc<dyn DidResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `resolver` for `method`, replacing any earlier one.
    pub fn register(&mut self, method: impl Into<String>, resolver: Arc<dyn DidResolver>) {
        let method = method.into();
        tracing::debug!(method = %method, "DID resolver registered");
        self.resolvers.insert(method, resolver);
    }

    /// Builder-style [`ResolverRegistry::register`].
    pub fn with(mut self, method: impl Into<String>, resolver: Arc<dyn DidResolver>) -> Self {
        self.register(method, resolver);
        self
    }

    pub fn supports(&self, method: &str) -> bool {
        self.resolvers.contains_key(method)
    }

    /// Registered method tags, sorted.
    pub fn methods(&self) -> Vec<String> {
        let mut methods: Vec<_> = self.resolvers.keys().cloned().collect();
        methods.sort();
        methods
    }

    /// Parse and resolve a DID string.
    pub async fn resolve_str(&self, did: &str) -> Result<DidDocument, ResolutionError> {
        let did = Did::new(did).map_err(|e| ResolutionError::Malformed(e.to_string()))?;
        self.resolve(&did).await
    }
}

#[async_trait]
impl DidResolver for ResolverRegistry {
    async fn resolve(&self, did: &Did) -> Result<DidDocument, ResolutionError> {
        let resolver = self
            .resolvers
            .get(did.method())
            .ok_or_else(|| ResolutionError::MethodNotSupported(did.method().to_string()))?;

        let doc = resolver.resolve(did).await?;

        if &doc.id != did {
            return Err(ResolutionError::Malformed(format!(
                "resolver for {} returned document for {}",
                did, doc.id
            )));
        }
        doc.validate()
            .map_err(|e| ResolutionError::Malformed(e.to_string()))?;

        tracing::debug!(did = %did, methods = doc.verification_method.len(), "DID resolved");
        Ok(doc)
    }
}
