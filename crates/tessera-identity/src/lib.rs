//! Tessera Identity Layer
//!
//! - DID documents with ordered verification methods
//! - A local DID method with key addition, rotation and revocation
//! - Method-keyed resolver registry and an opt-in TTL cache
//! - Trust registry with scoped anchors and bounded delegation

pub mod cache;
pub mod did;
pub mod did_resolver;
pub mod document;
pub mod error;
pub mod trust_registry;

pub use cache::CachingResolver;
pub use did::DidManager;
pub use did_resolver::{DidResolver, LocalDidMethod, ResolverRegistry};
pub use document::{DidDocument, VerificationMethod};
pub use error::{IdentityError, ResolutionError, TrustError};
pub use trust_registry::{TrustAnchor, TrustPath, TrustRegistry, MAX_DELEGATION_HOPS};
