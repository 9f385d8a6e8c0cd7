//! `tessera chain`: build and check digest chains.

use anyhow::Context;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use tessera_anchor::{build_chain, check_anchor, verify_links, Artifact, ChainReport, Linkset};
use tessera_core::TesseraConfig;
use tessera_credentials::Credential;
use tessera_crypto::Digest;

use super::{digest_settings, read_input, write_output};

#[derive(Subcommand, Debug)]
pub enum ChainCommand {
    /// Digest artifacts into a linkset.
    Build(ChainBuildArgs),
    /// Recompute a chain and report the first diverging layer.
    Verify(ChainVerifyArgs),
}

#[derive(Args, Debug)]
pub struct ChainBuildArgs {
    /// Artifact files, named by their file name.
    #[arg(short, long = "artifact", required = true)]
    pub artifacts: Vec<PathBuf>,

    /// Hash algorithm (sha256, blake3). Defaults to the config value.
    #[arg(long)]
    pub algorithm: Option<String>,

    /// Output file for the linkset; printed when absent.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ChainVerifyArgs {
    /// Linkset JSON file.
    #[arg(short, long)]
    pub linkset: PathBuf,

    /// Artifact files, named by their file name.
    #[arg(short, long = "artifact")]
    pub artifacts: Vec<PathBuf>,

    /// Signed credential referencing the linkset (inline or path to file).
    #[arg(short, long)]
    pub credential: String,

    /// Digest recorded on the ledger, checked against the credential.
    #[arg(long)]
    pub anchored_digest: Option<String>,
}

pub fn run(command: &ChainCommand, config: &TesseraConfig) -> anyhow::Result<()> {
    match command {
        ChainCommand::Build(args) => build(args, config),
        ChainCommand::Verify(args) => verify(args),
    }
}

fn load_artifact(path: &Path) -> anyhow::Result<Artifact> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("artifact path {} has no file name", path.display()))?;
    let content = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Artifact::new(name, content))
}

fn build(args: &ChainBuildArgs, config: &TesseraConfig) -> anyhow::Result<()> {
    let (algorithm, _) = digest_settings(config, args.algorithm.as_deref(), None)?;
    let artifacts = args
        .artifacts
        .iter()
        .map(|p| load_artifact(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let linkset = build_chain(&artifacts, algorithm)?;
    write_output(args.out.as_deref(), &linkset.to_json_pretty()?)?;
    eprintln!("Linkset digest: {}", linkset.digest);
    Ok(())
}

fn verify(args: &ChainVerifyArgs) -> anyhow::Result<()> {
    let linkset = Linkset::from_json(&std::fs::read_to_string(&args.linkset)?)?;
    let artifacts = args
        .artifacts
        .iter()
        .map(|p| load_artifact(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let credential = Credential::from_json(&read_input(&args.credential)?)?;

    let mut report = verify_links(&artifacts, &linkset, &credential)?;
    if report.is_intact() {
        if let Some(raw) = &args.anchored_digest {
            report = check_anchor(&credential, &Digest::parse(raw)?)?;
        }
    }

    match &report {
        ChainReport::Intact => {
            println!("Digest chain is INTACT");
            Ok(())
        }
        ChainReport::Diverged {
            layer,
            expected,
            found,
        } => {
            println!("Digest chain DIVERGED at {}", layer);
            println!("  expected: {}", expected);
            println!("  found:    {}", found);
            anyhow::bail!("digest chain diverged at {}", layer)
        }
    }
}
