//! Tessera CLI: offline front end for the trust and integrity engine.
//!
//! Subcommands: init, keygen, digest, issue, verify, chain.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tessera_core::TesseraConfig;
use tracing_subscriber::EnvFilter;

/// Tessera: verifiable credentials and digest chains.
#[derive(Parser, Debug)]
#[command(name = "tessera", version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, global = true, default_value = "tessera.toml")]
    config: PathBuf,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file.
    Init(commands::init::InitArgs),
    /// Generate a key pair and a local DID document.
    Keygen(commands::keygen::KeygenArgs),
    /// Compute the digest of a file.
    Digest(commands::digest::DigestArgs),
    /// Issue a signed credential.
    Issue(commands::issue::IssueArgs),
    /// Run the verification pipeline on a credential.
    Verify(commands::verify::VerifyArgs),
    /// Build or check a digest chain.
    #[command(subcommand)]
    Chain(commands::chain::ChainCommand),
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = TesseraConfig::load(&cli.config)?;
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_tracing(&config.logging.level, &config.logging.format);

    match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Keygen(args) => commands::keygen::run(args),
        Commands::Digest(args) => commands::digest::run(args, &config),
        Commands::Issue(args) => commands::issue::run(args).await,
        Commands::Verify(args) => commands::verify::run(args, &config).await,
        Commands::Chain(cmd) => commands::chain::run(cmd, &config),
    }
}
