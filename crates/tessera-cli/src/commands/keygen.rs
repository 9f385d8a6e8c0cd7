//! `tessera keygen`: generate a key pair and a local DID.

use clap::Args;
use std::path::PathBuf;
use tessera_crypto::{KeyPair, KeyType};
use tessera_identity::DidManager;

use super::{write_output, KeyFile};

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Key algorithm (ed25519, secp256k1).
    #[arg(short = 't', long, default_value = "ed25519")]
    pub key_type: String,

    /// DID method for the new identifier.
    #[arg(short, long, default_value = "local")]
    pub method: String,

    /// Output file for the key file; printed when absent.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &KeygenArgs) -> anyhow::Result<()> {
    let key_type: KeyType = args.key_type.parse()?;
    let keypair = KeyPair::generate(key_type);

    let manager = DidManager::new();
    let did = manager.create_did(&args.method, &keypair.public_key())?;
    let document = manager
        .resolve_did(&did)
        .ok_or_else(|| anyhow::anyhow!("document for {} missing after creation", did))?;

    let key_file = KeyFile {
        did: did.clone(),
        fragment: "keys-1".into(),
        key_type: key_type.to_string(),
        secret_key: hex::encode(keypair.secret_bytes().as_slice()),
        document,
    };
    write_output(args.out.as_deref(), &serde_json::to_string_pretty(&key_file)?)?;
    eprintln!("DID: {}", did);

    Ok(())
}
