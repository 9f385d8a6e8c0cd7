//! Tessera credentials: the credential and proof data model, issuance,
//! status lists, the verification pipeline and presentations.

pub mod builder;
pub mod credential;
pub mod error;
pub mod issuer;
pub mod presentation;
pub mod proof;
pub mod status;
pub mod verifier;

pub use builder::CredentialBuilder;
pub use credential::{Credential, StatusReference, CREDENTIALS_CONTEXT};
pub use error::{CredentialError, ProofError, StatusError};
pub use issuer::{CredentialIssuer, IssueOptions};
pub use presentation::{
    HolderCheck, Presentation, PresentationBuilder, PresentationOutcome, PresentationVerifier,
};
pub use proof::{
    signing_input, Proof, ProofGenerator, ProofOptions, ProofVerifier, ASSERTION_METHOD,
    AUTHENTICATION,
};
pub use status::{StatusList, StatusResolver};
pub use verifier::{
    CredentialVerifier, FailureKind, StageResult, StageStatus, VerificationOutcome,
    VerificationStage, VerificationWarning,
};
