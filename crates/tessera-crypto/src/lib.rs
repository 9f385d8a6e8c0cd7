//! Tessera Crypto
//!
//! - Canonical serialization (RFC 8785 JCS) with field exclusion
//! - Self-describing digests (`<algorithm>:<encoding>:<value>`)
//! - Ed25519 and secp256k1 key material
//! - The `Signer` capability consumed by issuers, plus an in-memory keyring
//! - Proof suites keyed by suite id

pub mod canonical;
pub mod digest;
pub mod error;
pub mod keys;
pub mod signing;
pub mod suite;

pub use canonical::{canonicalize, CanonicalBytes};
pub use digest::{digest, Digest, DigestAlgorithm, DigestEncoding};
pub use error::CryptoError;
pub use keys::{decode_multibase, encode_multibase, KeyPair, KeyType, PublicKey};
pub use signing::{sign, verify, LocalKeyring, Signer};
pub use suite::{EcdsaSecp256k1Signature2019, Ed25519Signature2020, ProofSuite, SuiteRegistry};
