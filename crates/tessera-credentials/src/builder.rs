use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tessera_core::{truncate_to_seconds, Claims, Did, BASE_CREDENTIAL_TYPE};
use uuid::Uuid;

use crate::credential::{Credential, StatusReference, CREDENTIALS_CONTEXT};
use crate::error::CredentialError;

/// Plain configuration for an unsigned credential.
///
/// Fill in the fields, then call [`CredentialBuilder::build`] once; the
/// result is validated and immutable from then on.
#[derive(Debug, Clone, Default)]
pub struct CredentialBuilder {
    /// Defaults to a fresh `urn:uuid:` (UUIDv7).
    pub id: Option<String>,
    /// Specific types; the base type is always placed first.
    pub types: Vec<String>,
    pub issuer: Option<Did>,
    pub subject: Claims,
    /// Defaults to now.
    pub issuance_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub status: Option<StatusReference>,
    /// Additional top-level members.
    pub extra: Map<String, Value>,
}

impl CredentialBuilder {
    /// Validate and construct the unsigned credential.
    pub fn build(self) -> Result<Credential, CredentialError> {
        let issuer = self
            .issuer
            .ok_or_else(|| CredentialError::MissingField("issuer".into()))?;

        let mut types = vec![BASE_CREDENTIAL_TYPE.to_string()];
        for t in self.types {
            if t.trim().is_empty() {
                return Err(CredentialError::InvalidStructure("empty type tag".into()));
            }
            if !types.contains(&t) {
                types.push(t);
            }
        }

        for reserved in [
            "@context",
            "id",
            "type",
            "issuer",
            "credentialSubject",
            "issuanceDate",
            "expirationDate",
            "credentialStatus",
            "proof",
        ] {
            if self.extra.contains_key(reserved) {
                return Err(CredentialError::InvalidStructure(format!(
                    "extra member {} shadows a credential field",
                    reserved
                )));
            }
        }

        let credential = Credential {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: self
                .id
                .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::now_v7())),
            types,
            issuer,
            credential_subject: self.subject,
            issuance_date: truncate_to_seconds(self.issuance_date.unwrap_or_else(Utc::now)),
            expiration_date: self.expiration_date.map(truncate_to_seconds),
            credential_status: self.status,
            proof: None,
            extra: self.extra,
        };
        credential.check_structure()?;
        Ok(credential)
    }
}
