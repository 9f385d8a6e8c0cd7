//! Engine configuration loading and management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::CoreError;

/// Full configuration for a Tessera deployment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TesseraConfig {
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Verification pipeline settings.
    #[serde(default)]
    pub verification: VerificationConfig,

    /// Digest engine settings.
    #[serde(default)]
    pub digest: DigestConfig,

    /// Ledger anchoring settings.
    #[serde(default)]
    pub anchor: AnchorConfig,

    /// Trust anchors and delegations loaded into the trust registry.
    #[serde(default)]
    pub trust: TrustConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Whether the issuer trust stage runs.
///
/// Skipping must be chosen explicitly; the default enforces it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustPolicy {
    #[default]
    Enforce,
    Skip,
}

impl fmt::Display for TrustPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enforce => write!(f, "enforce"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VerificationConfig {
    /// Issuer trust stage policy.
    #[serde(default)]
    pub trust_check: TrustPolicy,
    /// Opt-in TTL for cached DID resolution. Absent means every
    /// verification re-resolves.
    #[serde(default)]
    pub resolver_cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Hash algorithm tag (sha256, blake3).
    #[serde(default = "default_digest_algorithm")]
    pub algorithm: String,
    /// Digest value encoding (hex, base58btc).
    #[serde(default = "default_digest_encoding")]
    pub encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnchorConfig {
    /// Chain id used when a command names none.
    #[serde(default = "default_chain_id")]
    pub default_chain: String,
    /// Blocks required before an anchor counts as confirmed.
    #[serde(default = "default_confirmation_depth")]
    pub confirmation_depth: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrustConfig {
    #[serde(default)]
    pub anchors: Vec<TrustAnchorConfig>,
    #[serde(default)]
    pub delegations: Vec<DelegationConfig>,
}

/// A trust anchor as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustAnchorConfig {
    /// Issuer DID.
    pub issuer: String,
    /// Credential types the issuer is trusted for. Empty means all.
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// How many delegation hops below this issuer are accepted.
    #[serde(default)]
    pub delegation_depth: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationConfig {
    pub delegator: String,
    pub delegate: String,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}
fn default_digest_algorithm() -> String {
    "sha256".into()
}
fn default_digest_encoding() -> String {
    "hex".into()
}
fn default_chain_id() -> String {
    "memory".into()
}
fn default_confirmation_depth() -> u64 {
    3
}
fn default_poll_interval_ms() -> u64 {
    500
}
fn default_confirmation_timeout_secs() -> u64 {
    120
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self {
            algorithm: default_digest_algorithm(),
            encoding: default_digest_encoding(),
        }
    }
}

impl Default for AnchorConfig {
    fn default() -> Self {
        Self {
            default_chain: default_chain_id(),
            confirmation_depth: default_confirmation_depth(),
            poll_interval_ms: default_poll_interval_ms(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

impl TesseraConfig {
    /// Load config from a TOML file, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Self::from_toml(&contents)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, CoreError> {
        toml::from_str(contents).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
