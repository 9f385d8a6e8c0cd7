//! Credential verification pipeline.
//!
//! Stages run in a fixed order and the first failure ends the run:
//! structural, proof, issuer trust, temporal, revocation. The outcome keeps
//! the results of every stage that ran, so a rejection always names the
//! stage and the reason.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tessera_core::{Clock, StatusState, SystemClock, TrustPolicy};
use tessera_crypto::SuiteRegistry;
use tessera_identity::{DidResolver, TrustError, TrustRegistry};

use crate::credential::Credential;
use crate::error::{ProofError, StatusError};
use crate::proof::{Proof, ProofVerifier, ASSERTION_METHOD};
use crate::status::StatusResolver;

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VerificationStage {
    #[serde(rename = "StructuralCheck")]
    Structural,
    #[serde(rename = "ProofCheck")]
    Proof,
    #[serde(rename = "IssuerTrustCheck")]
    IssuerTrust,
    #[serde(rename = "TemporalCheck")]
    Temporal,
    #[serde(rename = "RevocationCheck")]
    Revocation,
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Structural => "StructuralCheck",
            Self::Proof => "ProofCheck",
            Self::IssuerTrust => "IssuerTrustCheck",
            Self::Temporal => "TemporalCheck",
            Self::Revocation => "RevocationCheck",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Passed,
    Skipped,
    Failed,
}

/// What happened in one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageResult {
    pub stage: VerificationStage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Why a credential or presentation was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    Malformed,
    InvalidSignature,
    UnresolvableKey,
    KeyBindingMismatch,
    SuiteMismatch,
    UnsupportedAlgorithm,
    UntrustedIssuer,
    TrustPathTooLong,
    Expired,
    NotYetValid,
    Revoked,
    Suspended,
    StatusUnknown,
    ReplayDetected,
    /// The signing capability failed; the proof was never produced.
    SignerUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl From<&ProofError> for FailureKind {
    fn from(e: &ProofError) -> Self {
        match e {
            ProofError::UnresolvableKey { .. } => Self::UnresolvableKey,
            ProofError::KeyBindingMismatch(_) => Self::KeyBindingMismatch,
            ProofError::SuiteMismatch { .. } => Self::SuiteMismatch,
            ProofError::UnsupportedSuite(_) => Self::UnsupportedAlgorithm,
            ProofError::Malformed(_) => Self::Malformed,
            ProofError::InvalidSignature(_) => Self::InvalidSignature,
            ProofError::Signer(_) => Self::SignerUnavailable,
        }
    }
}

impl From<&TrustError> for FailureKind {
    fn from(e: &TrustError) -> Self {
        match e {
            TrustError::TrustPathTooLong { .. } => Self::TrustPathTooLong,
            _ => Self::UntrustedIssuer,
        }
    }
}

/// Non-fatal findings reported alongside a valid outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationWarning {
    /// The issuer trust stage was disabled by the caller.
    TrustCheckSkipped,
}

/// Terminal result of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum VerificationOutcome {
    Valid {
        warnings: Vec<VerificationWarning>,
        stages: Vec<StageResult>,
    },
    Invalid {
        failed_stage: VerificationStage,
        kind: FailureKind,
        reasons: Vec<String>,
        /// Results of the stages that ran, the failed one last.
        stages: Vec<StageResult>,
    },
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }

    pub fn stages(&self) -> &[StageResult] {
        match self {
            Self::Valid { stages, .. } | Self::Invalid { stages, .. } => stages,
        }
    }

    pub fn warnings(&self) -> &[VerificationWarning] {
        match self {
            Self::Valid { warnings, .. } => warnings,
            Self::Invalid { .. } => &[],
        }
    }

    /// The failed stage and failure kind, if any.
    pub fn failure(&self) -> Option<(VerificationStage, FailureKind)> {
        match self {
            Self::Valid { .. } => None,
            Self::Invalid {
                failed_stage, kind, ..
            } => Some((*failed_stage, *kind)),
        }
    }
}

/// Accumulates stage results during one run.
#[derive(Default)]
struct Report {
    stages: Vec<StageResult>,
    warnings: Vec<VerificationWarning>,
}

impl Report {
    fn pass(&mut self, stage: VerificationStage) {
        tracing::debug!(stage = %stage, "stage passed");
        self.stages.push(StageResult {
            stage,
            status: StageStatus::Passed,
            detail: None,
        });
    }

    fn skip(&mut self, stage: VerificationStage, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::debug!(stage = %stage, detail = %detail, "stage skipped");
        self.stages.push(StageResult {
            stage,
            status: StageStatus::Skipped,
            detail: Some(detail),
        });
    }

    fn fail(
        mut self,
        stage: VerificationStage,
        kind: FailureKind,
        reason: impl Into<String>,
    ) -> VerificationOutcome {
        let reason = reason.into();
        tracing::debug!(stage = %stage, kind = %kind, reason = %reason, "stage failed");
        self.stages.push(StageResult {
            stage,
            status: StageStatus::Failed,
            detail: Some(reason.clone()),
        });
        VerificationOutcome::Invalid {
            failed_stage: stage,
            kind,
            reasons: vec![reason],
            stages: self.stages,
        }
    }

    fn finish(self) -> VerificationOutcome {
        VerificationOutcome::Valid {
            warnings: self.warnings,
            stages: self.stages,
        }
    }
}

/// Runs the verification pipeline against current DID documents, trust
/// state and status lists.
pub struct CredentialVerifier {
    proofs: ProofVerifier,
    trust: Arc<TrustRegistry>,
    status: Option<Arc<dyn StatusResolver>>,
    clock: Arc<dyn Clock>,
    trust_policy: TrustPolicy,
}

impl CredentialVerifier {
    /// A verifier that enforces issuer trust and has no status resolver.
    pub fn new(resolver: Arc<dyn DidResolver>, trust: Arc<TrustRegistry>) -> Self {
        Self {
            proofs: ProofVerifier::new(resolver),
            trust,
            status: None,
            clock: Arc::new(SystemClock),
            trust_policy: TrustPolicy::Enforce,
        }
    }

    pub fn with_status_resolver(mut self, status: Arc<dyn StatusResolver>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Disabling the trust stage is explicit and leaves a warning on every
    /// outcome.
    pub fn with_trust_policy(mut self, policy: TrustPolicy) -> Self {
        self.trust_policy = policy;
        self
    }

    pub fn with_suites(mut self, suites: SuiteRegistry) -> Self {
        self.proofs = self.proofs.with_suites(suites);
        self
    }

    pub fn proof_verifier(&self) -> &ProofVerifier {
        &self.proofs
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Parse and verify a credential. Unparseable input fails the
    /// structural stage.
    pub async fn verify_json(&self, json: &str) -> VerificationOutcome {
        match Credential::from_json(json) {
            Ok(credential) => self.verify(&credential).await,
            Err(e) => Report::default().fail(
                VerificationStage::Structural,
                FailureKind::Malformed,
                e.to_string(),
            ),
        }
    }

    /// Run every stage against `credential`.
    pub async fn verify(&self, credential: &Credential) -> VerificationOutcome {
        let outcome = self.run(credential).await;
        match &outcome {
            VerificationOutcome::Valid { warnings, .. } => tracing::info!(
                credential_id = %credential.id,
                issuer = %credential.issuer,
                warnings = warnings.len(),
                "credential valid"
            ),
            VerificationOutcome::Invalid {
                failed_stage, kind, ..
            } => tracing::info!(
                credential_id = %credential.id,
                issuer = %credential.issuer,
                stage = %failed_stage,
                kind = %kind,
                "credential rejected"
            ),
        }
        outcome
    }

    async fn run(&self, credential: &Credential) -> VerificationOutcome {
        let mut report = Report::default();
        let now = self.clock.now();

        let proof = match structural_check(credential) {
            Ok(proof) => proof,
            Err(reason) => {
                return report.fail(
                    VerificationStage::Structural,
                    FailureKind::Malformed,
                    reason,
                )
            }
        };
        report.pass(VerificationStage::Structural);

        // Neither lookup depends on the other.
        let (key, status) = tokio::join!(
            self.proofs.resolve_key(proof, &credential.issuer),
            self.lookup_status(credential),
        );

        if let Err(e) = key.and_then(|key| self.proofs.check_signature(credential, proof, &key)) {
            return report.fail(VerificationStage::Proof, FailureKind::from(&e), e.to_string());
        }
        report.pass(VerificationStage::Proof);

        match self.trust_policy {
            TrustPolicy::Enforce => {
                match self
                    .trust
                    .resolve_path_for(&credential.issuer, &credential.types, now)
                {
                    Ok(path) => {
                        tracing::debug!(
                            root = %path.root(),
                            depth = path.depth(),
                            "issuer trusted"
                        );
                        report.pass(VerificationStage::IssuerTrust);
                    }
                    Err(e) => {
                        return report.fail(
                            VerificationStage::IssuerTrust,
                            FailureKind::from(&e),
                            e.to_string(),
                        )
                    }
                }
            }
            TrustPolicy::Skip => {
                tracing::warn!(issuer = %credential.issuer, "issuer trust check disabled");
                report.skip(
                    VerificationStage::IssuerTrust,
                    "trust check disabled by configuration",
                );
                report.warnings.push(VerificationWarning::TrustCheckSkipped);
            }
        }

        if now < credential.issuance_date {
            return report.fail(
                VerificationStage::Temporal,
                FailureKind::NotYetValid,
                format!("issued at {}, now {}", credential.issuance_date, now),
            );
        }
        if proof.created > now {
            return report.fail(
                VerificationStage::Temporal,
                FailureKind::NotYetValid,
                format!("proof created at {}, now {}", proof.created, now),
            );
        }
        if let Some(expiration) = credential.expiration_date {
            if now >= expiration {
                return report.fail(
                    VerificationStage::Temporal,
                    FailureKind::Expired,
                    format!("expired at {}, now {}", expiration, now),
                );
            }
        }
        report.pass(VerificationStage::Temporal);

        match status {
            None => report.skip(VerificationStage::Revocation, "no status reference"),
            Some(Ok(StatusState::Active)) => report.pass(VerificationStage::Revocation),
            Some(Ok(StatusState::Revoked)) => {
                return report.fail(
                    VerificationStage::Revocation,
                    FailureKind::Revoked,
                    "credential revoked",
                )
            }
            Some(Ok(StatusState::Suspended)) => {
                return report.fail(
                    VerificationStage::Revocation,
                    FailureKind::Suspended,
                    "credential suspended",
                )
            }
            Some(Ok(StatusState::Unknown)) => {
                tracing::warn!(credential_id = %credential.id, "status unknown");
                return report.fail(
                    VerificationStage::Revocation,
                    FailureKind::StatusUnknown,
                    "status list has no entry for this credential",
                );
            }
            Some(Err(e)) => {
                tracing::warn!(credential_id = %credential.id, error = %e, "status lookup failed");
                return report.fail(
                    VerificationStage::Revocation,
                    FailureKind::StatusUnknown,
                    e.to_string(),
                );
            }
        }

        report.finish()
    }

    /// `None` when the credential carries no status reference.
    async fn lookup_status(
        &self,
        credential: &Credential,
    ) -> Option<Result<StatusState, StatusError>> {
        let reference = credential.credential_status.as_ref()?;
        Some(match &self.status {
            Some(resolver) => resolver.resolve(reference).await,
            None => Err(StatusError::Unreachable(
                "no status resolver configured".into(),
            )),
        })
    }
}

fn structural_check(credential: &Credential) -> Result<&Proof, String> {
    credential.check_structure().map_err(|e| e.to_string())?;
    let proof = credential
        .proof
        .as_ref()
        .ok_or_else(|| "credential has no proof".to_string())?;
    if proof.proof_purpose != ASSERTION_METHOD {
        return Err(format!(
            "proof purpose must be {}, got {}",
            ASSERTION_METHOD, proof.proof_purpose
        ));
    }
    if proof.proof_value.is_empty() {
        return Err("proof has no proofValue".into());
    }
    Ok(proof)
}
