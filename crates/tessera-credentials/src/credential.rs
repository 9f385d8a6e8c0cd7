use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_core::{Claims, Did, BASE_CREDENTIAL_TYPE};
use tessera_crypto::{CanonicalBytes, CryptoError, Digest, DigestAlgorithm};

use crate::error::CredentialError;
use crate::proof::Proof;

/// Default JSON-LD context written on new credentials and presentations.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";

/// Reference to an entry on an external status list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReference {
    pub id: String,
    #[serde(rename = "type")]
    pub status_type: String,
    /// `revocation` or `suspension`.
    pub status_purpose: String,
    pub status_list_index: u64,
    /// Identifier of the list the index points into.
    pub status_list_credential: String,
}

impl StatusReference {
    pub const TYPE: &'static str = "StatusList2021Entry";

    pub fn new(list_id: &str, index: u64, purpose: &str) -> Self {
        Self {
            id: format!("{}#{}", list_id, index),
            status_type: Self::TYPE.to_string(),
            status_purpose: purpose.to_string(),
            status_list_index: index,
            status_list_credential: list_id.to_string(),
        }
    }
}

/// A verifiable credential.
///
/// Members not modelled here are kept in `extra` and survive a
/// deserialize/serialize round trip, so they are covered by the proof.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub issuer: Did,
    pub credential_subject: Claims,
    pub issuance_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential_status: Option<StatusReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credential {
    /// Parse a credential from its JSON wire form.
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CredentialError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// An unsigned credential must never be treated as verified.
    pub fn is_signed(&self) -> bool {
        self.proof.is_some()
    }

    /// Type tags after the base type.
    pub fn specific_types(&self) -> &[String] {
        self.types.get(1..).unwrap_or_default()
    }

    pub fn has_type(&self, credential_type: &str) -> bool {
        self.types.iter().any(|t| t == credential_type)
    }

    /// Canonical bytes with the proof excluded: the document half of the
    /// signing input.
    pub fn unsigned_bytes(&self) -> Result<CanonicalBytes, CryptoError> {
        CanonicalBytes::excluding(self, &["proof"])
    }

    /// Digest of the full signed credential, proof included.
    pub fn digest(&self, algorithm: DigestAlgorithm) -> Result<Digest, CryptoError> {
        Ok(Digest::of_canonical(&CanonicalBytes::new(self)?, algorithm))
    }

    /// Structural invariants every credential must hold, signed or not.
    pub fn check_structure(&self) -> Result<(), CredentialError> {
        if self.id.trim().is_empty() {
            return Err(CredentialError::MissingField("id".into()));
        }
        match self.types.first() {
            Some(first) if first == BASE_CREDENTIAL_TYPE => {}
            Some(first) => {
                return Err(CredentialError::InvalidStructure(format!(
                    "first type must be {}, got {}",
                    BASE_CREDENTIAL_TYPE, first
                )))
            }
            None => return Err(CredentialError::MissingField("type".into())),
        }
        if self.types[1..].iter().any(|t| t == BASE_CREDENTIAL_TYPE) {
            return Err(CredentialError::InvalidStructure(format!(
                "{} listed more than once",
                BASE_CREDENTIAL_TYPE
            )));
        }
        if self.credential_subject.is_empty() {
            return Err(CredentialError::MissingField("credentialSubject".into()));
        }
        if let Some(expiration) = self.expiration_date {
            if expiration <= self.issuance_date {
                return Err(CredentialError::InvalidStructure(
                    "expirationDate must be after issuanceDate".into(),
                ));
            }
        }
        Ok(())
    }
}
