use crate::status::StatusState;

/// Core errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: StatusState, to: StatusState },

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid DID: {0}")]
    InvalidDid(String),

    #[error("invalid DID URL: {0}")]
    InvalidDidUrl(String),

    #[error("claims must be a JSON object, got {0}")]
    ClaimsNotObject(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
