pub mod chain;
pub mod digest;
pub mod init;
pub mod issue;
pub mod keygen;
pub mod verify;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tessera_core::{Did, TesseraConfig};
use tessera_crypto::{DigestAlgorithm, DigestEncoding, KeyPair, KeyType};
use tessera_identity::{DidDocument, DidManager};

/// Key material and DID document written by `tessera keygen`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFile {
    pub did: Did,
    pub fragment: String,
    pub key_type: String,
    /// Hex-encoded secret key.
    pub secret_key: String,
    pub document: DidDocument,
}

impl KeyFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading key file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing key file {}", path.display()))
    }

    pub fn keypair(&self) -> anyhow::Result<KeyPair> {
        let key_type: KeyType = self.key_type.parse()?;
        let secret = hex::decode(&self.secret_key).context("decoding secret key")?;
        Ok(KeyPair::from_bytes(key_type, &secret)?)
    }
}

/// Read a file, or treat the argument as inline content when no such file
/// exists.
pub fn read_input(value: &str) -> anyhow::Result<String> {
    let path = Path::new(value);
    if path.exists() {
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
    } else {
        Ok(value.to_string())
    }
}

pub fn write_output(path: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, contents).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => println!("{}", contents),
    }
    Ok(())
}

/// Populate a DID manager from documents stored on disk.
pub fn load_documents<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Arc<DidManager>> {
    let manager = Arc::new(DidManager::new());
    for path in paths {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading DID document {}", path.display()))?;
        // Key files carry their document; plain documents are accepted too.
        let document = match serde_json::from_str::<KeyFile>(&contents) {
            Ok(key_file) => key_file.document,
            Err(_) => serde_json::from_str::<DidDocument>(&contents)
                .with_context(|| format!("parsing DID document {}", path.display()))?,
        };
        manager.import_document(document)?;
    }
    Ok(manager)
}

/// Digest algorithm and encoding, flags first, then the config file.
pub fn digest_settings(
    config: &TesseraConfig,
    algorithm: Option<&str>,
    encoding: Option<&str>,
) -> anyhow::Result<(DigestAlgorithm, DigestEncoding)> {
    let algorithm = algorithm.unwrap_or(&config.digest.algorithm).parse()?;
    let encoding = encoding.unwrap_or(&config.digest.encoding).parse()?;
    Ok((algorithm, encoding))
}
