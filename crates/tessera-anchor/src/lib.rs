//! Tessera anchoring layer.
//!
//! Binds artifacts to a linkset, the linkset to a credential, and the
//! credential to an external ledger. Only digests ever leave the process;
//! ledgers are reached through pluggable [`AnchorClient`] adapters keyed by
//! chain id.

pub mod adapters;
pub mod chain;
pub mod coordinator;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use adapters::memory::InMemoryLedger;
pub use chain::{
    build_chain, check_anchor, embed_reference, referenced_digest, verify_links, Artifact,
    ChainLayer, ChainReport, Link, Linkset,
};
pub use coordinator::AnchorCoordinator;
pub use error::AnchorError;
pub use registry::AnchorRegistry;
pub use traits::AnchorClient;
pub use types::{AnchorReference, AnchorStatus};
