//! FHE Error types

use thiserror::Error;

/// Errors raised by the coprocessor interface and the decryption oracle
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FHEError {
    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid ciphertext handle
    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Malformed cleartext encoding
    #[error("Invalid cleartext: {0}")]
    InvalidCleartext(String),

    /// A KMS signature did not verify
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Not enough distinct KMS signers
    #[error("Signature threshold not met: got {got}, need {need}")]
    ThresholdNotMet { got: usize, need: usize },

    /// Request id was never issued by this oracle
    #[error("Unknown decryption request: {0}")]
    UnknownRequest(u64),

    /// Plaintext does not fit the requested FHE type
    #[error("Overflow: value {value} does not fit {fhe_type}")]
    Overflow { value: u64, fhe_type: String },

    /// Invalid key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
