//! `tessera digest`: digest a file.

use anyhow::Context;
use clap::Args;
use std::path::PathBuf;
use tessera_core::TesseraConfig;
use tessera_crypto::{CanonicalBytes, Digest};

use super::digest_settings;

#[derive(Args, Debug)]
pub struct DigestArgs {
    /// File to digest.
    pub file: PathBuf,

    /// Parse the file as JSON and digest its canonical form.
    #[arg(long)]
    pub canonical: bool,

    /// Hash algorithm (sha256, blake3). Defaults to the config value.
    #[arg(short, long)]
    pub algorithm: Option<String>,

    /// Value encoding (hex, base58btc). Defaults to the config value.
    #[arg(short, long)]
    pub encoding: Option<String>,
}

pub fn run(args: &DigestArgs, config: &TesseraConfig) -> anyhow::Result<()> {
    let digest = compute(args, config)?;
    println!("{}", digest);
    Ok(())
}

fn compute(args: &DigestArgs, config: &TesseraConfig) -> anyhow::Result<Digest> {
    let (algorithm, encoding) =
        digest_settings(config, args.algorithm.as_deref(), args.encoding.as_deref())?;
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    let digest = if args.canonical {
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .with_context(|| format!("{} is not valid JSON", args.file.display()))?;
        Digest::of_canonical(&CanonicalBytes::new(&value)?, algorithm)
    } else {
        Digest::compute(&bytes, algorithm)
    };
    tracing::debug!(file = %args.file.display(), canonical = args.canonical, "digest computed");
    Ok(digest.with_encoding(encoding))
}
