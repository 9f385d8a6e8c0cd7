use std::fmt;

use crate::error::CoreError;

/// Current state of a credential as reported by a status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    /// Credential is in good standing.
    Active,
    /// Credential is temporarily suspended.
    Suspended,
    /// Credential has been permanently revoked. Final state.
    Revoked,
    /// The status source could not say.
    Unknown,
}

impl StatusState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Suspended => write!(f, "suspended"),
            Self::Revoked => write!(f, "revoked"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Events that change an entry on a status list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// Issuer suspends the credential temporarily.
    Suspend,
    /// Issuer reinstates a suspended credential.
    Reinstate,
    /// Issuer permanently revokes the credential.
    Revoke,
}

/// Status list transitions.
///
/// Valid transitions:
/// - Active → Suspended (Suspend)
/// - Active → Revoked (Revoke)
/// - Suspended → Active (Reinstate)
/// - Suspended → Revoked (Revoke)
pub struct StatusStateMachine;

impl StatusStateMachine {
    /// Attempt a state transition based on an event.
    /// Returns the new state on success, or an error for invalid transitions.
    pub fn transition(current: StatusState, event: StatusEvent) -> Result<StatusState, CoreError> {
        let new_state = match (current, event) {
            (StatusState::Active, StatusEvent::Suspend) => StatusState::Suspended,
            (StatusState::Active, StatusEvent::Revoke) => StatusState::Revoked,

            (StatusState::Suspended, StatusEvent::Reinstate) => StatusState::Active,
            (StatusState::Suspended, StatusEvent::Revoke) => StatusState::Revoked,

            _ => {
                let target = match event {
                    StatusEvent::Suspend => StatusState::Suspended,
                    StatusEvent::Reinstate => StatusState::Active,
                    StatusEvent::Revoke => StatusState::Revoked,
                };
                return Err(CoreError::InvalidStatusTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "status transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: StatusState, event: StatusEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
