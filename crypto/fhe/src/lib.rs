//! VEIL FHE Coprocessor Interface
//!
//! Everything the attestation registry needs from the external homomorphic
//! encryption coprocessor, specified at its boundary:
//!
//! - `CiphertextHandle`: opaque references to ciphertexts, with an
//!   `is_initialized()` admission check
//! - `OracleBridge`: request decryption of ordered handles, then check the
//!   KMS signatures on the oracle's answer
//! - `KmsCommittee` / `DecryptionProof`: threshold ed25519 signatures over
//!   `(request_id, cleartexts)`
//! - `LocalCoprocessor`: an in-process oracle for development and tests
//!
//! The encryption mathematics stay inside the coprocessor.

pub mod cleartext;
pub mod coprocessor;
pub mod errors;
pub mod handle;
pub mod kms;
pub mod oracle;

pub use cleartext::{decode_cleartexts, encode_cleartexts, ClearValue, WORD_SIZE};
pub use coprocessor::{
    CoprocessorSnapshot, DecryptionResponse, LocalCoprocessor, PendingDecryption,
};
pub use errors::FHEError;
pub use handle::{CiphertextHandle, FheType, HANDLE_VERSION};
pub use kms::{
    decryption_digest, DecryptionProof, KmsCommittee, KmsPublicKey, KmsSignature, KmsSigner,
};
pub use oracle::{OracleBridge, RequestId};

use serde::{Deserialize, Serialize};

/// Default KMS committee size of the local coprocessor
pub const DEFAULT_SIGNER_COUNT: usize = 4;

/// Default threshold for a KMS committee of `n` signers (2/3 + 1)
pub fn default_threshold(n: usize) -> usize {
    (2 * n / 3) + 1
}

/// Coprocessor configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoprocessorConfig {
    /// Number of KMS signers in the committee
    pub signer_count: usize,
    /// Signatures required to accept a decryption result
    pub threshold: usize,
}

impl CoprocessorConfig {
    /// Committee of `signer_count` signers with the default threshold
    pub fn with_signers(signer_count: usize) -> Self {
        Self {
            signer_count,
            threshold: default_threshold(signer_count),
        }
    }

    pub fn validate(&self) -> FHEResult<()> {
        if self.threshold == 0 || self.threshold > self.signer_count {
            return Err(FHEError::ConfigError(format!(
                "threshold {} must be in 1..={}",
                self.threshold, self.signer_count
            )));
        }
        Ok(())
    }
}

impl Default for CoprocessorConfig {
    fn default() -> Self {
        Self::with_signers(DEFAULT_SIGNER_COUNT)
    }
}

/// Result type for FHE operations
pub type FHEResult<T> = Result<T, FHEError>;
