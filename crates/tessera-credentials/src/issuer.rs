use chrono::{DateTime, Utc};
use tessera_core::{Claims, Did};

use crate::builder::CredentialBuilder;
use crate::credential::{Credential, StatusReference};
use crate::error::CredentialError;
use crate::proof::{ProofGenerator, ProofOptions};

/// Optional settings for [`CredentialIssuer::issue`].
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    pub expiration: Option<DateTime<Utc>>,
    pub status: Option<StatusReference>,
    /// Specific types; the base type is added automatically.
    pub types: Vec<String>,
    /// Fixed credential id; a fresh UUID when absent.
    pub id: Option<String>,
}

/// Issues credentials signed through a [`ProofGenerator`].
///
/// The issuer holds no key material; signing goes through the generator's
/// signer capability.
pub struct CredentialIssuer {
    generator: ProofGenerator,
}

impl CredentialIssuer {
    pub fn new(generator: ProofGenerator) -> Self {
        Self { generator }
    }

    /// Build, validate and sign a credential.
    ///
    /// The issuance date comes from the generator's clock.
    pub async fn issue(
        &self,
        claims: Claims,
        issuer: &Did,
        key_fragment: &str,
        options: IssueOptions,
    ) -> Result<Credential, CredentialError> {
        let builder = CredentialBuilder {
            id: options.id,
            types: options.types,
            issuer: Some(issuer.clone()),
            subject: claims,
            issuance_date: Some(self.generator.clock().now()),
            expiration_date: options.expiration,
            status: options.status,
            ..Default::default()
        };
        self.issue_from(builder, key_fragment).await
    }

    /// Sign a credential described by `builder`.
    pub async fn issue_from(
        &self,
        builder: CredentialBuilder,
        key_fragment: &str,
    ) -> Result<Credential, CredentialError> {
        let mut credential = builder.build()?;
        let issuer = credential.issuer.clone();

        let proof = self
            .generator
            .create_proof(&credential, &issuer, key_fragment, ProofOptions::default())
            .await?;
        credential.proof = Some(proof);

        tracing::info!(
            issuer = %issuer,
            credential_id = %credential.id,
            types = ?credential.specific_types(),
            "credential issued"
        );
        Ok(credential)
    }
}
