//! Self-describing digests.
//!
//! A digest string carries its own algorithm and encoding tags:
//! `<algorithm>:<encoding>:<value>`, for example
//! `sha256:hex:44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a`.
//! Verifiers read the tags and never have to guess.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::canonical::CanonicalBytes;
use crate::error::CryptoError;

/// Hash algorithms the engine can produce and check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-256.
    #[default]
    Sha256,
    /// BLAKE3 (256-bit output).
    Blake3,
}

impl DigestAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Blake3 => "blake3",
        }
    }

    /// Hash raw bytes.
    pub fn digest_bytes(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Sha256 => Sha256::digest(data).into(),
            Self::Blake3 => *blake3::hash(data).as_bytes(),
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "blake3" => Ok(Self::Blake3),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Text encodings for the digest value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestEncoding {
    #[default]
    Hex,
    Base58Btc,
}

impl DigestEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Base58Btc => "base58btc",
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Hex => hex::encode(bytes),
            Self::Base58Btc => bs58::encode(bytes).into_string(),
        }
    }

    fn decode(&self, value: &str) -> Result<Vec<u8>, CryptoError> {
        match self {
            Self::Hex => hex::decode(value).map_err(|e| CryptoError::Encoding(e.to_string())),
            Self::Base58Btc => bs58::decode(value)
                .into_vec()
                .map_err(|e| CryptoError::Encoding(e.to_string())),
        }
    }
}

impl fmt::Display for DigestEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DigestEncoding {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex" => Ok(Self::Hex),
            "base58btc" => Ok(Self::Base58Btc),
            other => Err(CryptoError::UnsupportedAlgorithm(format!(
                "unknown digest encoding: {}",
                other
            ))),
        }
    }
}

/// A 256-bit digest with its algorithm and encoding tags.
///
/// Equality and hashing consider the algorithm and the hash bytes only, so
/// the same hash rendered as hex and as base58btc compares equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algorithm: DigestAlgorithm,
    encoding: DigestEncoding,
    bytes: [u8; 32],
}

impl Digest {
    /// Hash raw bytes with the given algorithm (hex encoding).
    pub fn compute(data: &[u8], algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            encoding: DigestEncoding::Hex,
            bytes: algorithm.digest_bytes(data),
        }
    }

    /// Hash canonical bytes.
    pub fn of_canonical(data: &CanonicalBytes, algorithm: DigestAlgorithm) -> Self {
        Self::compute(data.as_bytes(), algorithm)
    }

    /// Change the text encoding used when rendering.
    pub fn with_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn encoding(&self) -> DigestEncoding {
        self.encoding
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Recompute over `data` with this digest's algorithm and compare.
    pub fn matches(&self, data: &[u8]) -> bool {
        self.algorithm.digest_bytes(data) == self.bytes
    }

    /// Parse `<algorithm>:<encoding>:<value>`.
    pub fn parse(s: &str) -> Result<Self, CryptoError> {
        let mut parts = s.splitn(3, ':');
        let (algorithm, encoding, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(e), Some(v)) => (a, e, v),
            _ => {
                return Err(CryptoError::Encoding(format!(
                    "digest must be '<algorithm>:<encoding>:<value>', got: {}",
                    s
                )))
            }
        };
        let algorithm = DigestAlgorithm::from_str(algorithm)?;
        let encoding = DigestEncoding::from_str(encoding)?;
        let raw = encoding.decode(value)?;
        let bytes: [u8; 32] = raw.as_slice().try_into().map_err(|_| {
            CryptoError::Encoding(format!("digest must be 32 bytes, got {}", raw.len()))
        })?;
        Ok(Self {
            algorithm,
            encoding,
            bytes,
        })
    }
}

/// `digest(bytes, algorithm) -> self-describing digest`.
pub fn digest(data: &[u8], algorithm: DigestAlgorithm) -> Digest {
    Digest::compute(data, algorithm)
}

impl PartialEq for Digest {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.bytes == other.bytes
    }
}

impl Eq for Digest {}

impl Hash for Digest {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.algorithm.hash(state);
        self.bytes.hash(state);
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.algorithm,
            self.encoding,
            self.encoding.encode(&self.bytes)
        )
    }
}

impl FromStr for Digest {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = CryptoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> Self {
        d.to_string()
    }
}
