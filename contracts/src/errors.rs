//! Error types for the attestation registry

use thiserror::Error;
use veil_fhe::RequestId;

use crate::address::Address;
use crate::batch::BatchId;
use crate::cooldown::OperationKind;

/// Every way a registry operation can abort
///
/// A failed call leaves no trace in registry state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("Caller {caller} is not a registered provider")]
    NotProvider { caller: Address },

    #[error("Registry is paused")]
    PausedError,

    #[error("Cooldown active for {principal} ({kind}): ready at {ready_at}")]
    CooldownActive {
        principal: Address,
        kind: OperationKind,
        ready_at: u64,
    },

    #[error("Batch {batch_id} is not active")]
    BatchNotActive { batch_id: BatchId },

    #[error("Invalid batch: {batch_id}")]
    InvalidBatch { batch_id: BatchId },

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("Replay attempt for decryption request {request_id}")]
    ReplayAttempt { request_id: RequestId },

    #[error("State mismatch for request {request_id}: content of batch {batch_id} changed")]
    StateMismatch {
        request_id: RequestId,
        batch_id: BatchId,
    },

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Cooldown interval must be greater than zero")]
    InvalidCooldown,

    #[error("Oracle bridge unavailable: {0}")]
    OracleUnavailable(String),

    #[error("Oracle bridge reissued request id {request_id}")]
    DuplicateRequest { request_id: RequestId },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl RegistryError {
    /// Stable short name, used in logs and CLI output
    pub fn kind(&self) -> &'static str {
        match self {
            RegistryError::NotOwner { .. } => "NotOwner",
            RegistryError::NotProvider { .. } => "NotProvider",
            RegistryError::PausedError => "PausedError",
            RegistryError::CooldownActive { .. } => "CooldownActive",
            RegistryError::BatchNotActive { .. } => "BatchNotActive",
            RegistryError::InvalidBatch { .. } => "InvalidBatch",
            RegistryError::InvalidCiphertext(_) => "InvalidCiphertext",
            RegistryError::ReplayAttempt { .. } => "ReplayAttempt",
            RegistryError::StateMismatch { .. } => "StateMismatch",
            RegistryError::DecryptionFailed(_) => "DecryptionFailed",
            RegistryError::InvalidCooldown => "InvalidCooldown",
            RegistryError::OracleUnavailable(_) => "OracleUnavailable",
            RegistryError::DuplicateRequest { .. } => "DuplicateRequest",
            RegistryError::SerializationError(_) => "SerializationError",
        }
    }
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;
