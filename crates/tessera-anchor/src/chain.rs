//! Digest chains.
//!
//! artifact -> linkset -> credential -> ledger anchor. Each layer holds the
//! digest of the layer below it: a linkset lists artifact digests, a
//! credential carries the linkset digest in its subject claims, and the
//! ledger records the digest of the signed credential.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tessera_credentials::{Credential, CredentialBuilder};
use tessera_crypto::{CanonicalBytes, Digest, DigestAlgorithm};
use uuid::Uuid;

use crate::error::AnchorError;

/// Claim holding the linkset digest inside a credential subject.
pub const LINKSET_DIGEST_CLAIM: &str = "linksetDigest";
/// Claim holding the linkset id inside a credential subject.
pub const LINKSET_ID_CLAIM: &str = "linksetId";

/// A named piece of content whose digest enters a linkset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub content: Vec<u8>,
}

impl Artifact {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// An artifact holding the canonical form of a structured value.
    pub fn from_json<T>(name: impl Into<String>, value: &T) -> Result<Self, AnchorError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::new(name, CanonicalBytes::new(value)?.into_vec()))
    }

    pub fn digest(&self, algorithm: DigestAlgorithm) -> Digest {
        Digest::compute(&self.content, algorithm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub digest: Digest,
}

/// Ordered collection of artifact digests with a digest of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linkset {
    pub id: String,
    pub links: Vec<Link>,
    /// Digest of this linkset with the `digest` member excluded.
    pub digest: Digest,
}

impl Linkset {
    /// Recompute the linkset digest from its id and links.
    pub fn compute_digest(&self) -> Result<Digest, AnchorError> {
        let bytes = CanonicalBytes::excluding(self, &["digest"])?;
        Ok(Digest::of_canonical(&bytes, self.digest.algorithm())
            .with_encoding(self.digest.encoding()))
    }

    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.name == name)
    }

    pub fn from_json(json: &str) -> Result<Self, AnchorError> {
        serde_json::from_str(json).map_err(|e| AnchorError::InvalidChain(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String, AnchorError> {
        serde_json::to_string_pretty(self).map_err(|e| AnchorError::InvalidChain(e.to_string()))
    }
}

/// Digest every artifact and collect the results into a linkset.
///
/// Artifact order is kept. Names must be unique and non-empty.
pub fn build_chain(
    artifacts: &[Artifact],
    algorithm: DigestAlgorithm,
) -> Result<Linkset, AnchorError> {
    if artifacts.is_empty() {
        return Err(AnchorError::InvalidChain("no artifacts".into()));
    }
    let mut seen = HashSet::new();
    let mut links = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        if artifact.name.trim().is_empty() {
            return Err(AnchorError::InvalidChain("artifact with empty name".into()));
        }
        if !seen.insert(artifact.name.as_str()) {
            return Err(AnchorError::InvalidChain(format!(
                "duplicate artifact name {}",
                artifact.name
            )));
        }
        links.push(Link {
            name: artifact.name.clone(),
            digest: artifact.digest(algorithm),
        });
    }

    let mut linkset = Linkset {
        id: format!("urn:uuid:{}", Uuid::now_v7()),
        links,
        // Placeholder carrying the algorithm until the real value is known.
        digest: Digest::compute(&[], algorithm),
    };
    linkset.digest = linkset.compute_digest()?;

    tracing::debug!(
        linkset_id = %linkset.id,
        links = linkset.links.len(),
        digest = %linkset.digest,
        "linkset built"
    );
    Ok(linkset)
}

/// Record the linkset reference in the credential subject.
pub fn embed_reference(builder: &mut CredentialBuilder, linkset: &Linkset) {
    builder.subject.insert(LINKSET_ID_CLAIM, linkset.id.clone());
    builder
        .subject
        .insert(LINKSET_DIGEST_CLAIM, linkset.digest.to_string());
}

/// The linkset digest a credential refers to.
pub fn referenced_digest(credential: &Credential) -> Result<Digest, AnchorError> {
    let raw = credential
        .credential_subject
        .get_str(LINKSET_DIGEST_CLAIM)
        .ok_or_else(|| AnchorError::InvalidChain("credential carries no linkset digest".into()))?;
    Ok(Digest::parse(raw)?)
}

/// A layer of the digest chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "layer", content = "name")]
pub enum ChainLayer {
    Artifact(String),
    Linkset,
    CredentialReference,
    Anchor,
}

impl fmt::Display for ChainLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(name) => write!(f, "artifact {}", name),
            Self::Linkset => write!(f, "linkset"),
            Self::CredentialReference => write!(f, "credential reference"),
            Self::Anchor => write!(f, "anchor"),
        }
    }
}

/// Result of recomputing a digest chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome")]
pub enum ChainReport {
    Intact,
    Diverged {
        layer: ChainLayer,
        expected: String,
        found: String,
    },
}

impl ChainReport {
    pub fn is_intact(&self) -> bool {
        matches!(self, Self::Intact)
    }

    pub fn diverged_layer(&self) -> Option<&ChainLayer> {
        match self {
            Self::Intact => None,
            Self::Diverged { layer, .. } => Some(layer),
        }
    }

    pub(crate) fn diverged(
        layer: ChainLayer,
        expected: impl ToString,
        found: impl ToString,
    ) -> Self {
        tracing::warn!(layer = %layer, "digest chain diverged");
        Self::Diverged {
            layer,
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }
}

/// Recompute the local layers of a chain.
///
/// The linkset is checked against its own digest first, so an edited link
/// entry is reported as a linkset divergence rather than as a mismatch with
/// the untouched artifact. Then every artifact is checked against its link,
/// and finally the credential's reference against the linkset digest.
/// Two artifacts with the same name diverge at that artifact.
pub fn verify_links(
    artifacts: &[Artifact],
    linkset: &Linkset,
    credential: &Credential,
) -> Result<ChainReport, AnchorError> {
    let recomputed = linkset.compute_digest()?;
    if recomputed != linkset.digest {
        return Ok(ChainReport::diverged(ChainLayer::Linkset, &linkset.digest, recomputed));
    }

    let mut names = HashSet::new();
    if let Some(dup) = artifacts.iter().find(|a| !names.insert(a.name.as_str())) {
        return Ok(ChainReport::diverged(
            ChainLayer::Artifact(dup.name.clone()),
            "one artifact",
            "duplicate",
        ));
    }

    for link in &linkset.links {
        let Some(artifact) = artifacts.iter().find(|a| a.name == link.name) else {
            return Ok(ChainReport::diverged(
                ChainLayer::Artifact(link.name.clone()),
                &link.digest,
                "missing",
            ));
        };
        let actual = artifact.digest(link.digest.algorithm());
        if actual != link.digest {
            return Ok(ChainReport::diverged(
                ChainLayer::Artifact(link.name.clone()),
                &link.digest,
                actual,
            ));
        }
    }
    if let Some(extra) = artifacts.iter().find(|a| linkset.link(&a.name).is_none()) {
        return Ok(ChainReport::diverged(
            ChainLayer::Artifact(extra.name.clone()),
            "absent",
            extra.digest(linkset.digest.algorithm()),
        ));
    }

    let found = credential
        .credential_subject
        .get_str(LINKSET_DIGEST_CLAIM)
        .unwrap_or("missing");
    match Digest::parse(found) {
        Ok(reference) if reference == linkset.digest => Ok(ChainReport::Intact),
        _ => Ok(ChainReport::diverged(
            ChainLayer::CredentialReference,
            &linkset.digest,
            found,
        )),
    }
}

/// Compare the digest a ledger holds with the signed credential.
pub fn check_anchor(
    credential: &Credential,
    anchored: &Digest,
) -> Result<ChainReport, AnchorError> {
    let actual = credential.digest(anchored.algorithm())?;
    if actual != *anchored {
        return Ok(ChainReport::diverged(ChainLayer::Anchor, anchored, actual));
    }
    Ok(ChainReport::Intact)
}
