//! VEIL: Verifiable Encrypted Issuer Ledger
//!
//! This is the root crate that re-exports all VEIL components for integration
//! testing and provides unified access to the protocol primitives.
//!
//! ## Architecture Overview
//!
//! Approved providers submit organization-signed attestations whose payloads
//! are FHE ciphertext handles. Submissions collect in time-bounded batches;
//! the owner closes a batch and asks an external decryption oracle to reveal
//! it. The oracle answers asynchronously, and the registry accepts the answer
//! once, only with a valid KMS proof, and only while the batch content still
//! matches what was requested.
//!
//! ## Crate Organization
//!
//! - `veil-fhe`: ciphertext handles, the oracle bridge, KMS proofs and a
//!   local reference coprocessor
//! - `veil-registry`: the registry state machine
//! - `veil-storage`: redb persistence for snapshots and the event log

// Re-export all crates for integration testing
pub use veil_fhe as fhe;
pub use veil_registry as registry;
pub use veil_storage as storage;

/// VEIL protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol configuration defaults
pub mod config {
    pub use veil_fhe::{default_threshold, DEFAULT_SIGNER_COUNT};
    pub use veil_registry::{DEFAULT_COOLDOWN_SECONDS, FIRST_BATCH_ID};
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use veil_fhe::{
        CiphertextHandle, ClearValue, DecryptionProof, FheType, LocalCoprocessor, OracleBridge,
        RequestId,
    };
    pub use veil_registry::prelude::*;
    pub use veil_storage::{Storage, StoredEvent};
}
