//! Decryption oracle bridge
//!
//! The registry talks to the off-chain decryption oracle only through this
//! trait: it asks for a batch of handles to be decrypted and later checks the
//! signatures attached to the oracle's answer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{CiphertextHandle, DecryptionProof, FHEResult};

/// Identifier the bridge assigns to one decryption request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boundary operations offered by the external decryption oracle
pub trait OracleBridge: Send + Sync {
    /// Ask for decryption of `handles` in order; returns a fresh, unique id
    fn request_decryption(&self, handles: &[CiphertextHandle]) -> FHEResult<RequestId>;

    /// Authenticate `cleartexts` as the genuine result for `request_id`
    fn check_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> FHEResult<()>;
}

impl<T: OracleBridge + ?Sized> OracleBridge for Arc<T> {
    fn request_decryption(&self, handles: &[CiphertextHandle]) -> FHEResult<RequestId> {
        (**self).request_decryption(handles)
    }

    fn check_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> FHEResult<()> {
        (**self).check_signatures(request_id, cleartexts, proof)
    }
}
