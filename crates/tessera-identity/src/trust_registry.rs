//! Trusted-issuer registry.
//!
//! Anchors declare an issuer trusted, optionally scoped to credential types,
//! bounded in time, and allowed to delegate a number of hops. Delegation
//! edges point from a delegator to a delegate; a path is found by walking
//! from the issuer back towards an anchor.
//!
//! All state sits behind one readers-writer lock: mutations are exclusive
//! and atomic, queries run concurrently, and a removal is visible to every
//! query that starts after it returns.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tessera_core::config::TrustConfig;
use tessera_core::{Clock, Did, SystemClock};

use crate::error::{IdentityError, TrustError};

/// Upper bound on delegation hops explored, whatever anchors declare.
pub const MAX_DELEGATION_HOPS: u32 = 16;

/// A registry entry declaring an issuer trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustAnchor {
    pub issuer: Did,
    /// Credential types covered. Empty means every type.
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// How many delegation hops below the issuer are accepted.
    #[serde(default)]
    pub delegation_depth: u32,
}

impl TrustAnchor {
    /// An unscoped, unbounded anchor with no delegation.
    pub fn new(issuer: Did) -> Self {
        Self {
            issuer,
            scope: Vec::new(),
            valid_from: None,
            valid_until: None,
            delegation_depth: 0,
        }
    }

    pub fn with_scope<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_validity(
        mut self,
        valid_from: Option<DateTime<Utc>>,
        valid_until: Option<DateTime<Utc>>,
    ) -> Self {
        self.valid_from = valid_from;
        self.valid_until = valid_until;
        self
    }

    pub fn with_delegation_depth(mut self, depth: u32) -> Self {
        self.delegation_depth = depth;
        self
    }

    /// Whether `now` falls in `[valid_from, valid_until)`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_from.map_or(true, |from| now >= from)
            && self.valid_until.map_or(true, |until| now < until)
    }

    /// Whether the anchor covers at least one of `types`.
    pub fn covers<S: AsRef<str>>(&self, types: &[S]) -> bool {
        self.scope.is_empty()
            || types
                .iter()
                .any(|t| self.scope.iter().any(|s| s == t.as_ref()))
    }
}

/// A resolved chain from an anchored root down to the queried issuer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustPath {
    /// The anchor that terminates the path.
    pub anchor: TrustAnchor,
    /// Root first, queried issuer last.
    pub hops: Vec<Did>,
}

impl TrustPath {
    /// Number of delegation hops (0 when the issuer is anchored directly).
    pub fn depth(&self) -> u32 {
        self.hops.len().saturating_sub(1) as u32
    }

    pub fn root(&self) -> &Did {
        &self.anchor.issuer
    }
}

/// Which anchors a path search may accept.
#[derive(Debug, Clone, Copy)]
struct PathQuery<'a> {
    types: Option<&'a [String]>,
    now: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryState {
    anchors: HashMap<Did, Vec<TrustAnchor>>,
    /// delegate -> delegators
    delegators: HashMap<Did, BTreeSet<Did>>,
}

/// Shared, read-mostly trust state. Constructed explicitly and passed in.
pub struct TrustRegistry {
    state: RwLock<RegistryState>,
    clock: Arc<dyn Clock>,
}

impl Default for TrustRegistry {
    fn default() -> Self {
        Self {
            state: RwLock::default(),
            clock: Arc::new(SystemClock),
        }
    }
}

impl TrustRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clock used by the queries that take no explicit instant.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Build a registry from the `[trust]` config section.
    pub fn from_config(config: &TrustConfig) -> Result<Self, IdentityError> {
        let registry = Self::new();
        for entry in &config.anchors {
            let anchor = TrustAnchor {
                issuer: Did::new(entry.issuer.as_str())?,
                scope: entry.scope.clone(),
                valid_from: entry.valid_from,
                valid_until: entry.valid_until,
                delegation_depth: entry.delegation_depth,
            };
            registry.add_anchor(anchor);
        }
        for delegation in &config.delegations {
            registry.add_delegation(
                &Did::new(delegation.delegator.as_str())?,
                &Did::new(delegation.delegate.as_str())?,
            )?;
        }
        Ok(registry)
    }

    /// Register an anchor. An issuer may hold several anchors.
    pub fn add_anchor(&self, anchor: TrustAnchor) {
        tracing::info!(
            issuer = %anchor.issuer,
            scope = ?anchor.scope,
            delegation_depth = anchor.delegation_depth,
            "trust anchor added"
        );
        let mut state = self.state.write();
        state
            .anchors
            .entry(anchor.issuer.clone())
            .or_default()
            .push(anchor);
    }

    /// Remove every anchor for `issuer`. Returns how many were removed.
    pub fn remove_anchor(&self, issuer: &Did) -> usize {
        let removed = self
            .state
            .write()
            .anchors
            .remove(issuer)
            .map_or(0, |a| a.len());
        if removed > 0 {
            tracing::info!(issuer = %issuer, removed, "trust anchor removed");
        }
        removed
    }

    /// Record that `delegator` vouches for `delegate`.
    pub fn add_delegation(&self, delegator: &Did, delegate: &Did) -> Result<(), TrustError> {
        if delegator == delegate {
            return Err(TrustError::InvalidDelegation(format!(
                "{} cannot delegate to itself",
                delegator
            )));
        }
        self.state
            .write()
            .delegators
            .entry(delegate.clone())
            .or_default()
            .insert(delegator.clone());
        tracing::info!(delegator = %delegator, delegate = %delegate, "delegation added");
        Ok(())
    }

    pub fn remove_delegation(&self, delegator: &Did, delegate: &Did) -> bool {
        let mut state = self.state.write();
        let Some(set) = state.delegators.get_mut(delegate) else {
            return false;
        };
        let removed = set.remove(delegator);
        if set.is_empty() {
            state.delegators.remove(delegate);
        }
        if removed {
            tracing::info!(delegator = %delegator, delegate = %delegate, "delegation removed");
        }
        removed
    }

    /// Anchors registered directly for `issuer`.
    pub fn anchors_for(&self, issuer: &Did) -> Vec<TrustAnchor> {
        self.state
            .read()
            .anchors
            .get(issuer)
            .cloned()
            .unwrap_or_default()
    }

    pub fn anchor_count(&self) -> usize {
        self.state.read().anchors.values().map(Vec::len).sum()
    }

    /// Whether `issuer` is trusted for `credential_type` at the registry
    /// clock's current time.
    pub fn is_trusted(&self, issuer: &Did, credential_type: &str) -> bool {
        self.is_trusted_at(issuer, credential_type, self.clock.now())
    }

    pub fn is_trusted_at(&self, issuer: &Did, credential_type: &str, now: DateTime<Utc>) -> bool {
        let types = [credential_type.to_string()];
        self.find_path(
            issuer,
            PathQuery {
                types: Some(&types),
                now,
            },
        )
        .is_ok()
    }

    /// Resolve a path to any currently active anchor, regardless of scope.
    pub fn resolve_path(&self, issuer: &Did) -> Result<TrustPath, TrustError> {
        self.find_path(
            issuer,
            PathQuery {
                types: None,
                now: self.clock.now(),
            },
        )
    }

    /// Resolve a path to an anchor active at `now` whose scope covers at
    /// least one of `types`.
    pub fn resolve_path_for(
        &self,
        issuer: &Did,
        types: &[String],
        now: DateTime<Utc>,
    ) -> Result<TrustPath, TrustError> {
        self.find_path(
            issuer,
            PathQuery {
                types: Some(types),
                now,
            },
        )
    }

    /// Breadth-first walk from `issuer` towards anchors, so the shortest
    /// acceptable path wins. When nothing is acceptable, the most specific
    /// rejection is reported.
    fn find_path(&self, issuer: &Did, query: PathQuery<'_>) -> Result<TrustPath, TrustError> {
        let state = self.state.read();

        let mut queue = VecDeque::from([vec![issuer.clone()]]);
        let mut visited = HashSet::from([issuer.clone()]);
        let mut too_long: Option<(u32, u32)> = None;
        let mut out_of_scope = false;
        let mut inactive = false;

        while let Some(chain) = queue.pop_front() {
            let hops = (chain.len() - 1) as u32;
            let Some(node) = chain.last() else { continue };

            if let Some(anchors) = state.anchors.get(node) {
                for anchor in anchors {
                    if !anchor.is_active_at(query.now) {
                        inactive = true;
                        continue;
                    }
                    if let Some(types) = query.types {
                        if !anchor.covers(types) {
                            out_of_scope = true;
                            continue;
                        }
                    }
                    if hops > anchor.delegation_depth {
                        too_long.get_or_insert((hops, anchor.delegation_depth));
                        continue;
                    }
                    let mut path: Vec<Did> = chain.clone();
                    path.reverse();
                    tracing::debug!(
                        issuer = %issuer,
                        root = %anchor.issuer,
                        hops,
                        "trust path resolved"
                    );
                    return Ok(TrustPath {
                        anchor: anchor.clone(),
                        hops: path,
                    });
                }
            }

            if hops >= MAX_DELEGATION_HOPS {
                continue;
            }
            if let Some(delegators) = state.delegators.get(node) {
                for delegator in delegators {
                    if visited.insert(delegator.clone()) {
                        let mut next = chain.clone();
                        next.push(delegator.clone());
                        queue.push_back(next);
                    }
                }
            }
        }

        let issuer = issuer.to_string();
        if let Some((hops, max_depth)) = too_long {
            Err(TrustError::TrustPathTooLong {
                issuer,
                hops,
                max_depth,
            })
        } else if out_of_scope {
            Err(TrustError::OutOfScope { issuer })
        } else if inactive {
            Err(TrustError::AnchorInactive { issuer })
        } else {
            Err(TrustError::NotFound(issuer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tessera_core::FixedClock;

    fn did(name: &str) -> Did {
        Did::from_parts("local", name).unwrap()
    }

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_default_deny() {
        let registry = TrustRegistry::new();
        assert!(!registry.is_trusted(&did("nobody"), "RainfallCredential"));
        assert_eq!(
            registry.resolve_path(&did("nobody")),
            Err(TrustError::NotFound(did("nobody").to_string()))
        );
    }

    #[test]
    fn test_direct_anchor() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("bureau")));
        assert!(registry.is_trusted(&did("bureau"), "AnyCredential"));

        let path = registry.resolve_path(&did("bureau")).unwrap();
        assert_eq!(path.depth(), 0);
        assert_eq!(path.root(), &did("bureau"));
    }

    #[test]
    fn test_scoped_anchor() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("bureau")).with_scope(["RainfallCredential"]));
        assert!(registry.is_trusted(&did("bureau"), "RainfallCredential"));
        assert!(!registry.is_trusted(&did("bureau"), "DegreeCredential"));

        let result = registry.resolve_path_for(
            &did("bureau"),
            &types(&["VerifiableCredential", "DegreeCredential"]),
            Utc::now(),
        );
        assert!(matches!(result, Err(TrustError::OutOfScope { .. })));
    }

    #[test]
    fn test_validity_window() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = start + Duration::days(30);
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("bureau")).with_validity(Some(start), Some(end)));

        assert!(!registry.is_trusted_at(&did("bureau"), "X", start - Duration::seconds(1)));
        assert!(registry.is_trusted_at(&did("bureau"), "X", start));
        assert!(registry.is_trusted_at(&did("bureau"), "X", end - Duration::seconds(1)));
        assert!(!registry.is_trusted_at(&did("bureau"), "X", end));

        let result = registry.resolve_path_for(&did("bureau"), &types(&["X"]), end);
        assert!(matches!(result, Err(TrustError::AnchorInactive { .. })));
    }

    #[test]
    fn test_queries_follow_registry_clock() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start - Duration::days(1)));
        let registry = TrustRegistry::new().with_clock(clock.clone());
        registry.add_anchor(
            TrustAnchor::new(did("bureau"))
                .with_validity(Some(start), Some(start + Duration::days(30))),
        );

        assert!(!registry.is_trusted(&did("bureau"), "X"));
        assert!(matches!(
            registry.resolve_path(&did("bureau")),
            Err(TrustError::AnchorInactive { .. })
        ));

        clock.set(start + Duration::days(10));
        assert!(registry.is_trusted(&did("bureau"), "X"));
        assert!(registry.resolve_path(&did("bureau")).is_ok());

        clock.set(start + Duration::days(30));
        assert!(!registry.is_trusted(&did("bureau"), "X"));
    }

    #[test]
    fn test_delegation_within_depth() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("root")).with_delegation_depth(2));
        registry.add_delegation(&did("root"), &did("region")).unwrap();
        registry.add_delegation(&did("region"), &did("station")).unwrap();

        let path = registry.resolve_path(&did("station")).unwrap();
        assert_eq!(path.hops, vec![did("root"), did("region"), did("station")]);
        assert_eq!(path.depth(), 2);
        assert!(registry.is_trusted(&did("station"), "RainfallCredential"));
    }

    #[test]
    fn test_delegation_exceeds_depth() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("root")).with_delegation_depth(1));
        registry.add_delegation(&did("root"), &did("region")).unwrap();
        registry.add_delegation(&did("region"), &did("station")).unwrap();

        assert!(registry.resolve_path(&did("region")).is_ok());
        assert_eq!(
            registry.resolve_path(&did("station")),
            Err(TrustError::TrustPathTooLong {
                issuer: did("station").to_string(),
                hops: 2,
                max_depth: 1,
            })
        );
    }

    #[test]
    fn test_zero_depth_blocks_delegation() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("root")));
        registry.add_delegation(&did("root"), &did("leaf")).unwrap();
        assert!(matches!(
            registry.resolve_path(&did("leaf")),
            Err(TrustError::TrustPathTooLong { .. })
        ));
    }

    #[test]
    fn test_delegation_cycle_terminates() {
        let registry = TrustRegistry::new();
        registry.add_delegation(&did("a"), &did("b")).unwrap();
        registry.add_delegation(&did("b"), &did("a")).unwrap();
        assert!(matches!(
            registry.resolve_path(&did("a")),
            Err(TrustError::NotFound(_))
        ));
    }

    #[test]
    fn test_self_delegation_rejected() {
        let registry = TrustRegistry::new();
        assert!(matches!(
            registry.add_delegation(&did("a"), &did("a")),
            Err(TrustError::InvalidDelegation(_))
        ));
    }

    #[test]
    fn test_remove_anchor_revokes_delegates() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("root")).with_delegation_depth(1));
        registry.add_anchor(TrustAnchor::new(did("root")).with_scope(["Other"]));
        registry.add_delegation(&did("root"), &did("leaf")).unwrap();
        assert!(registry.is_trusted(&did("leaf"), "X"));

        assert_eq!(registry.remove_anchor(&did("root")), 2);
        assert!(!registry.is_trusted(&did("leaf"), "X"));
        assert_eq!(registry.anchor_count(), 0);
    }

    #[test]
    fn test_remove_delegation() {
        let registry = TrustRegistry::new();
        registry.add_anchor(TrustAnchor::new(did("root")).with_delegation_depth(1));
        registry.add_delegation(&did("root"), &did("leaf")).unwrap();
        assert!(registry.remove_delegation(&did("root"), &did("leaf")));
        assert!(!registry.remove_delegation(&did("root"), &did("leaf")));
        assert!(!registry.is_trusted(&did("leaf"), "X"));
    }

    #[test]
    fn test_from_config() {
        let config = tessera_core::TesseraConfig::from_toml(
            r#"
[[trust.anchors]]
issuer = "did:local:bureau"
scope = ["RainfallCredential"]
delegation_depth = 1

[[trust.delegations]]
delegator = "did:local:bureau"
delegate = "did:local:station"
"#,
        )
        .unwrap();
        let registry = TrustRegistry::from_config(&config.trust).unwrap();
        assert!(registry.is_trusted(&did("station"), "RainfallCredential"));
        assert_eq!(registry.anchors_for(&did("bureau")).len(), 1);
    }

    #[test]
    fn test_from_config_bad_did() {
        let config = tessera_core::TesseraConfig::from_toml(
            "[[trust.anchors]]\nissuer = \"bureau\"\n",
        )
        .unwrap();
        assert!(matches!(
            TrustRegistry::from_config(&config.trust),
            Err(IdentityError::Core(_))
        ));
    }

    #[test]
    fn test_concurrent_reads_and_removal() {
        let registry = Arc::new(TrustRegistry::new());
        registry.add_anchor(TrustAnchor::new(did("root")));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let _ = registry.is_trusted(&did("root"), "X");
                    }
                })
            })
            .collect();
        registry.remove_anchor(&did("root"));
        // Once removal returns, no query may see the anchor.
        assert!(!registry.is_trusted(&did("root"), "X"));
        for handle in readers {
            handle.join().unwrap();
        }
        assert!(!registry.is_trusted(&did("root"), "X"));
    }
}
