//! VEIL Attestation Registry
//!
//! A permissioned registry where approved providers submit encrypted
//! attestations into time-bounded batches. A closed batch can be revealed
//! through an asynchronous, oracle-mediated decryption whose callback is
//! accepted once and only against the batch content it was requested for.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              Registry Call Flow                      │
//! ├─────────────────────────────────────────────────────┤
//! │  AccessRegistry  (owner / provider allow-list)      │
//! │      ↓                                              │
//! │  PauseSwitch     (submit + validation requests)     │
//! │      ↓                                              │
//! │  CooldownGuard   (per principal, per operation)     │
//! │      ↓                                              │
//! │  BatchLedger     (one active batch, append-only)    │
//! │      ↓                                              │
//! │  DecryptionCoordinator (request → callback, once)   │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Properties
//!
//! - **Serialized**: every operation takes `&mut self` and fully completes
//! - **All-or-nothing**: guards run before the first mutation
//! - **Replay-safe**: each decryption request is consumed at most once
//! - **Content-pinned**: callbacks are rejected if the batch changed

pub mod access;
pub mod address;
pub mod batch;
pub mod clock;
pub mod cooldown;
pub mod decryption;
pub mod errors;
pub mod events;
pub mod pause;
pub mod registry;
pub mod state;
pub mod submission;

// Re-export main types
pub use access::AccessRegistry;
pub use address::{Address, AddressParseError};
pub use batch::{Batch, BatchId, BatchLedger, BatchTransition, SubmissionRecord, FIRST_BATCH_ID};
pub use clock::{Clock, ManualClock, SystemClock};
pub use cooldown::{CooldownGuard, CooldownState, OperationKind};
pub use decryption::{content_hash, DecryptionCoordinator, DecryptionOutcome, DecryptionRequest};
pub use errors::{RegistryError, RegistryResult};
pub use events::{EventLog, RegistryEvent};
pub use pause::PauseSwitch;
pub use registry::{AttestationRegistry, RegistryConfig, DEFAULT_COOLDOWN_SECONDS};
pub use state::RegistryState;
pub use submission::validate_handle;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::address::Address;
    pub use crate::batch::{Batch, BatchId, SubmissionRecord};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::cooldown::OperationKind;
    pub use crate::decryption::{DecryptionOutcome, DecryptionRequest};
    pub use crate::errors::{RegistryError, RegistryResult};
    pub use crate::events::RegistryEvent;
    pub use crate::registry::{AttestationRegistry, RegistryConfig};
    pub use crate::state::RegistryState;
}
