use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_core::{StatusEvent, StatusState, StatusStateMachine};

use crate::credential::StatusReference;
use crate::error::StatusError;

/// Looks up the current state behind a status reference.
///
/// Called lazily on every verification; implementations must not cache
/// answers indefinitely.
#[async_trait]
pub trait StatusResolver: Send + Sync {
    async fn resolve(&self, status: &StatusReference) -> Result<StatusState, StatusError>;
}

/// An in-memory status list.
pub struct StatusList {
    id: String,
    entries: DashMap<u64, StatusState>,
    next_index: AtomicU64,
}

impl StatusList {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: DashMap::new(),
            next_index: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Allocate a fresh `Active` entry and return its reference.
    pub fn allocate(&self, purpose: &str) -> StatusReference {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(index, StatusState::Active);
        StatusReference::new(&self.id, index, purpose)
    }

    /// Current state of `index`; unallocated indices are `Unknown`.
    pub fn state(&self, index: u64) -> StatusState {
        self.entries
            .get(&index)
            .map(|s| *s)
            .unwrap_or(StatusState::Unknown)
    }

    /// Apply a status event through the state machine.
    pub fn apply(&self, index: u64, event: StatusEvent) -> Result<StatusState, StatusError> {
        let mut entry = self
            .entries
            .get_mut(&index)
            .ok_or(StatusError::UnknownIndex(index))?;
        let next = StatusStateMachine::transition(*entry, event)
            .map_err(|e| StatusError::Transition(e.to_string()))?;
        *entry = next;
        tracing::info!(list = %self.id, index, state = %next, "status changed");
        Ok(next)
    }

    pub fn suspend(&self, index: u64) -> Result<StatusState, StatusError> {
        self.apply(index, StatusEvent::Suspend)
    }

    pub fn reinstate(&self, index: u64) -> Result<StatusState, StatusError> {
        self.apply(index, StatusEvent::Reinstate)
    }

    pub fn revoke(&self, index: u64) -> Result<StatusState, StatusError> {
        self.apply(index, StatusEvent::Revoke)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl StatusResolver for StatusList {
    async fn resolve(&self, status: &StatusReference) -> Result<StatusState, StatusError> {
        if status.status_list_credential != self.id {
            return Err(StatusError::UnknownList(
                status.status_list_credential.clone(),
            ));
        }
        Ok(self.state(status.status_list_index))
    }
}
