//! Holder-signed presentations.
//!
//! The holder proof uses the `authentication` purpose and carries the
//! verifier's challenge (and optional domain) inside the signed proof
//! options, so a presentation captured in one session cannot be replayed in
//! another.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tessera_core::{Did, BASE_PRESENTATION_TYPE};
use uuid::Uuid;

use crate::credential::{Credential, CREDENTIALS_CONTEXT};
use crate::error::CredentialError;
use crate::proof::{Proof, ProofGenerator, ProofOptions, AUTHENTICATION};
use crate::verifier::{CredentialVerifier, FailureKind, VerificationOutcome};

/// A bundle of credentials shown by their holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presentation {
    #[serde(rename = "@context", default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
    pub id: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    pub holder: Did,
    pub verifiable_credential: Vec<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<Proof>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Presentation {
    pub fn from_json(json: &str) -> Result<Self, CredentialError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, CredentialError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Plain configuration for a presentation.
#[derive(Debug, Clone, Default)]
pub struct PresentationBuilder {
    pub id: Option<String>,
    pub holder: Option<Did>,
    pub credentials: Vec<Credential>,
}

impl PresentationBuilder {
    /// Validate and construct the unsigned presentation.
    pub fn build(self) -> Result<Presentation, CredentialError> {
        let holder = self
            .holder
            .ok_or_else(|| CredentialError::MissingField("holder".into()))?;
        if self.credentials.is_empty() {
            return Err(CredentialError::MissingField("verifiableCredential".into()));
        }
        if let Some(unsigned) = self.credentials.iter().find(|c| !c.is_signed()) {
            return Err(CredentialError::InvalidStructure(format!(
                "credential {} is not signed",
                unsigned.id
            )));
        }

        Ok(Presentation {
            context: vec![CREDENTIALS_CONTEXT.to_string()],
            id: self
                .id
                .unwrap_or_else(|| format!("urn:uuid:{}", Uuid::now_v7())),
            types: vec![BASE_PRESENTATION_TYPE.to_string()],
            holder,
            verifiable_credential: self.credentials,
            proof: None,
            extra: Map::new(),
        })
    }

    /// Build and sign with the holder's key `fragment`, bound to the
    /// verifier-supplied `challenge` and `domain`.
    pub async fn sign(
        self,
        generator: &ProofGenerator,
        fragment: &str,
        challenge: &str,
        domain: Option<&str>,
    ) -> Result<Presentation, CredentialError> {
        let mut presentation = self.build()?;
        let holder = presentation.holder.clone();
        let proof = generator
            .create_proof(
                &presentation,
                &holder,
                fragment,
                ProofOptions::authentication(challenge, domain.map(str::to_string)),
            )
            .await?;
        presentation.proof = Some(proof);

        tracing::info!(
            holder = %holder,
            presentation_id = %presentation.id,
            credentials = presentation.verifiable_credential.len(),
            "presentation signed"
        );
        Ok(presentation)
    }
}

/// Result of the holder-binding check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum HolderCheck {
    Valid,
    Invalid { kind: FailureKind, reason: String },
}

impl HolderCheck {
    fn invalid(kind: FailureKind, reason: impl Into<String>) -> Self {
        Self::Invalid {
            kind,
            reason: reason.into(),
        }
    }
}

/// Holder check plus one outcome per embedded credential, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentationOutcome {
    pub holder: HolderCheck,
    pub credentials: Vec<VerificationOutcome>,
}

impl PresentationOutcome {
    /// Valid only when the holder proof and every credential are valid.
    pub fn is_valid(&self) -> bool {
        self.holder == HolderCheck::Valid && self.credentials.iter().all(|c| c.is_valid())
    }
}

/// Verifies presentations for one verifier session.
pub struct PresentationVerifier {
    credentials: Arc<CredentialVerifier>,
}

impl PresentationVerifier {
    pub fn new(credentials: Arc<CredentialVerifier>) -> Self {
        Self { credentials }
    }

    /// Verify the holder proof against `expected_challenge` and
    /// `expected_domain`, and every embedded credential through the full
    /// pipeline.
    pub async fn verify(
        &self,
        presentation: &Presentation,
        expected_challenge: &str,
        expected_domain: Option<&str>,
    ) -> PresentationOutcome {
        let credential_checks = join_all(
            presentation
                .verifiable_credential
                .iter()
                .map(|c| self.credentials.verify(c)),
        );
        let (holder, credentials) = tokio::join!(
            self.check_holder(presentation, expected_challenge, expected_domain),
            credential_checks,
        );

        let outcome = PresentationOutcome {
            holder,
            credentials,
        };
        tracing::info!(
            holder = %presentation.holder,
            presentation_id = %presentation.id,
            valid = outcome.is_valid(),
            "presentation verified"
        );
        outcome
    }

    async fn check_holder(
        &self,
        presentation: &Presentation,
        expected_challenge: &str,
        expected_domain: Option<&str>,
    ) -> HolderCheck {
        if presentation.types.first().map(String::as_str) != Some(BASE_PRESENTATION_TYPE) {
            return HolderCheck::invalid(
                FailureKind::Malformed,
                format!("first type must be {}", BASE_PRESENTATION_TYPE),
            );
        }
        if presentation.verifiable_credential.is_empty() {
            return HolderCheck::invalid(FailureKind::Malformed, "presentation has no credentials");
        }
        let Some(proof) = presentation.proof.as_ref() else {
            return HolderCheck::invalid(FailureKind::Malformed, "presentation has no proof");
        };
        if proof.proof_purpose != AUTHENTICATION {
            return HolderCheck::invalid(
                FailureKind::Malformed,
                format!("proof purpose must be {}", AUTHENTICATION),
            );
        }

        if proof.challenge.as_deref() != Some(expected_challenge) {
            tracing::warn!(holder = %presentation.holder, "presentation challenge mismatch");
            return HolderCheck::invalid(
                FailureKind::ReplayDetected,
                "challenge does not match this session",
            );
        }
        if proof.domain.as_deref() != expected_domain {
            tracing::warn!(holder = %presentation.holder, "presentation domain mismatch");
            return HolderCheck::invalid(
                FailureKind::ReplayDetected,
                "domain does not match this verifier",
            );
        }

        let now = self.credentials.clock().now();
        if proof.created > now {
            return HolderCheck::invalid(
                FailureKind::NotYetValid,
                format!("proof created at {}, now {}", proof.created, now),
            );
        }

        match self
            .credentials
            .proof_verifier()
            .verify(presentation, proof, &presentation.holder)
            .await
        {
            Ok(()) => HolderCheck::Valid,
            Err(e) => HolderCheck::invalid(FailureKind::from(&e), e.to_string()),
        }
    }
}
