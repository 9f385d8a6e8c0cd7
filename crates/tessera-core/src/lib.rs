//! Tessera core: identifiers, claims, status states, clock and
//! configuration shared by every other crate of the
//! Tessera trust and integrity engine.

pub mod clock;
pub mod config;
pub mod error;
pub mod status;
pub mod types;

pub use clock::{truncate_to_seconds, Clock, FixedClock, SystemClock};
pub use config::{TesseraConfig, TrustPolicy};
pub use error::CoreError;
pub use status::{StatusEvent, StatusState, StatusStateMachine};
pub use types::{Claims, Did, DidUrl, BASE_CREDENTIAL_TYPE, BASE_PRESENTATION_TYPE};
