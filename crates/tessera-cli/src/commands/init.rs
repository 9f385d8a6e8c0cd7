//! `tessera init`: write a default configuration file.

use clap::Args;
use std::path::PathBuf;
use tessera_core::TesseraConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to current directory).
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

pub fn run(args: &InitArgs) -> anyhow::Result<()> {
    let config_path = args.dir.join("tessera.toml");

    if config_path.exists() {
        anyhow::bail!("configuration file already exists at {}", config_path.display());
    }

    TesseraConfig::default().save(&config_path)?;
    tracing::info!(path = %config_path.display(), "wrote default config");
    println!("Initialized Tessera at {}", config_path.display());
    println!("Add trust anchors under [[trust.anchors]] before verifying credentials.");

    Ok(())
}
