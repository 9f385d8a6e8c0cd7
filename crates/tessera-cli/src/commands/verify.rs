//! `tessera verify`: run the verification pipeline on a credential.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tessera_core::{TesseraConfig, TrustPolicy};
use tessera_credentials::{CredentialVerifier, StageStatus, VerificationOutcome};
use tessera_identity::{
    CachingResolver, DidResolver, LocalDidMethod, ResolverRegistry, TrustRegistry,
};

use super::{load_documents, read_input};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON (inline or path to file).
    #[arg(short, long)]
    pub credential: String,

    /// DID documents or key files of the parties involved.
    #[arg(short, long = "did-document")]
    pub did_documents: Vec<PathBuf>,

    /// Skip the issuer trust stage. The outcome carries a warning.
    #[arg(long)]
    pub skip_trust: bool,

    /// Print the outcome as JSON.
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &VerifyArgs, config: &TesseraConfig) -> anyhow::Result<()> {
    let json = read_input(&args.credential)?;

    let manager = load_documents(&args.did_documents)?;
    let registry = ResolverRegistry::new().with(
        LocalDidMethod::METHOD,
        Arc::new(LocalDidMethod::new(manager)),
    );
    let resolver: Arc<dyn DidResolver> = match config.verification.resolver_cache_ttl_secs {
        Some(ttl) => Arc::new(CachingResolver::new(
            Arc::new(registry),
            chrono::Duration::seconds(i64::try_from(ttl)?),
        )),
        None => Arc::new(registry),
    };
    let trust = Arc::new(TrustRegistry::from_config(&config.trust)?);

    let policy = if args.skip_trust {
        TrustPolicy::Skip
    } else {
        config.verification.trust_check
    };
    let verifier = CredentialVerifier::new(resolver, trust).with_trust_policy(policy);
    let outcome = verifier.verify_json(&json).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if let Some((stage, kind)) = outcome.failure() {
        anyhow::bail!("credential rejected at {}: {}", stage, kind);
    }
    Ok(())
}

fn print_outcome(outcome: &VerificationOutcome) {
    if outcome.is_valid() {
        println!("Credential is VALID");
    } else {
        println!("Credential is INVALID");
    }
    println!();
    for result in outcome.stages() {
        let label = match result.status {
            StageStatus::Passed => "PASS",
            StageStatus::Skipped => "SKIP",
            StageStatus::Failed => "FAIL",
        };
        print!("  [{}] {}", label, result.stage);
        if let Some(detail) = &result.detail {
            print!(": {}", detail);
        }
        println!();
    }
    for warning in outcome.warnings() {
        println!("  warning: {:?}", warning);
    }
    if let VerificationOutcome::Invalid { reasons, .. } = outcome {
        for reason in reasons {
            println!("  reason: {}", reason);
        }
    }
}
