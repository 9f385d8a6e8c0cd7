//! Shared fixtures for the cross-crate tests.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tessera_core::{Did, FixedClock};
use tessera_credentials::{CredentialIssuer, CredentialVerifier, ProofGenerator, StatusList};
use tessera_crypto::{KeyPair, KeyType, LocalKeyring};
use tessera_identity::{DidManager, DidResolver, LocalDidMethod, TrustRegistry};

/// Fixed starting instant for every scenario.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

/// One local DID method, one keyring and one clock shared by every party.
pub struct World {
    pub manager: Arc<DidManager>,
    pub keyring: Arc<LocalKeyring>,
    pub clock: Arc<FixedClock>,
    pub resolver: Arc<dyn DidResolver>,
    pub trust: Arc<TrustRegistry>,
    pub statuses: Arc<StatusList>,
}

impl World {
    pub fn new() -> Self {
        let manager = Arc::new(DidManager::new());
        let clock = Arc::new(FixedClock::new(epoch()));
        Self {
            resolver: Arc::new(LocalDidMethod::new(manager.clone())),
            manager,
            keyring: Arc::new(LocalKeyring::new()),
            trust: Arc::new(TrustRegistry::new().with_clock(clock.clone())),
            clock,
            statuses: Arc::new(StatusList::new("urn:status:world")),
        }
    }

    /// Create a DID whose `#keys-1` secret lives in the shared keyring.
    pub fn enroll(&self, key_type: KeyType) -> Did {
        let keypair = KeyPair::generate(key_type);
        let did = self
            .manager
            .create_did("local", &keypair.public_key())
            .expect("create DID");
        self.keyring
            .insert(did.with_fragment("keys-1").to_string(), keypair);
        did
    }

    pub fn generator(&self) -> ProofGenerator {
        ProofGenerator::new(self.keyring.clone(), self.resolver.clone())
            .with_clock(self.clock.clone())
    }

    pub fn issuer(&self) -> CredentialIssuer {
        CredentialIssuer::new(self.generator())
    }

    /// A verifier wired to the shared trust registry and status list.
    pub fn verifier(&self) -> CredentialVerifier {
        CredentialVerifier::new(self.resolver.clone(), self.trust.clone())
            .with_clock(self.clock.clone())
            .with_status_resolver(self.statuses.clone())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
