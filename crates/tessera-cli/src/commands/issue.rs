//! `tessera issue`: issue a signed credential from a key file.

use chrono::{Duration, Utc};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tessera_anchor::{embed_reference, Linkset};
use tessera_core::Claims;
use tessera_credentials::{CredentialBuilder, CredentialIssuer, ProofGenerator};
use tessera_crypto::LocalKeyring;
use tessera_identity::LocalDidMethod;

use super::{load_documents, read_input, write_output, KeyFile};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Issuer key file produced by `tessera keygen`.
    #[arg(short, long)]
    pub key: PathBuf,

    /// Subject claims as a JSON object (inline or path to file).
    #[arg(short, long)]
    pub claims: String,

    /// Credential type(s), comma-separated.
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub credential_type: Vec<String>,

    /// Expire the credential this many days after issuance.
    #[arg(long)]
    pub expires_in_days: Option<i64>,

    /// Linkset whose digest the credential should reference.
    #[arg(long)]
    pub linkset: Option<PathBuf>,

    /// Output file; printed when absent.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub async fn run(args: &IssueArgs) -> anyhow::Result<()> {
    let key_file = KeyFile::load(&args.key)?;
    let claims: serde_json::Value = serde_json::from_str(&read_input(&args.claims)?)
        .map_err(|e| anyhow::anyhow!("invalid claims JSON: {}", e))?;

    let manager = load_documents(&[&args.key])?;
    let keyring = Arc::new(LocalKeyring::new());
    keyring.insert(
        key_file.did.with_fragment(&key_file.fragment).to_string(),
        key_file.keypair()?,
    );
    let issuer = CredentialIssuer::new(ProofGenerator::new(
        keyring,
        Arc::new(LocalDidMethod::new(manager)),
    ));

    let now = Utc::now();
    let mut builder = CredentialBuilder {
        types: args.credential_type.clone(),
        issuer: Some(key_file.did.clone()),
        subject: Claims::from_value(claims)?,
        issuance_date: Some(now),
        expiration_date: args.expires_in_days.map(|days| now + Duration::days(days)),
        ..Default::default()
    };
    if let Some(path) = &args.linkset {
        let linkset = Linkset::from_json(&std::fs::read_to_string(path)?)?;
        embed_reference(&mut builder, &linkset);
    }

    let credential = issuer.issue_from(builder, &key_file.fragment).await?;
    write_output(args.out.as_deref(), &credential.to_json_pretty()?)?;
    eprintln!("Issued {}", credential.id);

    Ok(())
}
