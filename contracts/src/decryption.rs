//! Two-phase decryption coordination
//!
//! Phase 1 (`request_batch_validation`) pins the content hash of a closed
//! batch and hands its ordered handles to the oracle. Phase 2
//! (`on_decryption_result`) arrives later as an unrelated call. It is
//! accepted at most once per request, and only if the batch content still
//! hashes to the pinned value and the oracle's proof verifies.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};
use veil_fhe::{decode_cleartexts, CiphertextHandle, ClearValue, DecryptionProof, OracleBridge, RequestId};

use crate::address::Address;
use crate::batch::BatchId;
use crate::clock::Clock;
use crate::cooldown::OperationKind;
use crate::errors::{RegistryError, RegistryResult};
use crate::events::RegistryEvent;
use crate::registry::AttestationRegistry;

/// Domain separator for batch content hashes
pub const CONTENT_HASH_DOMAIN: &[u8] = b"veil.batch-content.v1";

/// Hash of a batch's ordered handles, bound to the registry identity
pub fn content_hash(registry: &Address, handles: &[CiphertextHandle]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONTENT_HASH_DOMAIN);
    hasher.update(registry.as_bytes());
    hasher.update(&(handles.len() as u64).to_le_bytes());
    for handle in handles {
        hasher.update(handle.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Durable record of one validation request; never deleted
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequest {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    pub content_hash: [u8; 32],
    /// Flips false -> true once, on the first successful callback
    pub processed: bool,
    pub requested_at: u64,
    pub handle_count: usize,
}

/// Authenticated, de-duplicated decryption result
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptionOutcome {
    pub request_id: RequestId,
    pub batch_id: BatchId,
    /// One value per submission, in submission order
    pub values: Vec<ClearValue>,
    pub result_digest: [u8; 32],
}

/// Table of decryption requests keyed by bridge-assigned id
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCoordinator {
    requests: BTreeMap<RequestId, DecryptionRequest>,
}

impl DecryptionCoordinator {
    pub fn get(&self, id: RequestId) -> Option<&DecryptionRequest> {
        self.requests.get(&id)
    }

    /// All requests in id order
    pub fn requests(&self) -> impl Iterator<Item = &DecryptionRequest> {
        self.requests.values()
    }

    pub fn pending(&self) -> impl Iterator<Item = &DecryptionRequest> {
        self.requests.values().filter(|r| !r.processed)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn insert(&mut self, request: DecryptionRequest) -> RegistryResult<()> {
        if self.requests.contains_key(&request.request_id) {
            return Err(RegistryError::DuplicateRequest {
                request_id: request.request_id,
            });
        }
        self.requests.insert(request.request_id, request);
        Ok(())
    }

    /// A request that exists and has not been consumed
    fn unprocessed(&self, id: RequestId) -> RegistryResult<&DecryptionRequest> {
        match self.requests.get(&id) {
            Some(request) if !request.processed => Ok(request),
            _ => Err(RegistryError::ReplayAttempt { request_id: id }),
        }
    }

    fn mark_processed(&mut self, id: RequestId) {
        if let Some(request) = self.requests.get_mut(&id) {
            request.processed = true;
        }
    }
}

impl<O: OracleBridge, C: Clock> AttestationRegistry<O, C> {
    /// Phase 1: ask the oracle to decrypt a closed batch
    ///
    /// Guard order: owner, not paused, decryption cooldown, closed batch.
    /// An empty batch is a valid target.
    pub fn request_batch_validation(
        &mut self,
        caller: &Address,
        batch_id: BatchId,
    ) -> RegistryResult<RequestId> {
        let now = self.clock.now();

        self.state.access.ensure_owner(caller)?;
        self.state.pause.ensure_not_paused()?;
        self.state
            .cooldown
            .check(caller, OperationKind::DecryptionRequest, now)?;
        self.state.ledger.ensure_closed(batch_id)?;

        let handles = self.state.ledger.handles(batch_id);
        let hash = content_hash(&self.state.address, &handles);

        let request_id = self
            .oracle
            .request_decryption(&handles)
            .map_err(|e| RegistryError::OracleUnavailable(e.to_string()))?;

        let inserted = self.state.decryption.insert(DecryptionRequest {
            request_id,
            batch_id,
            content_hash: hash,
            processed: false,
            requested_at: now,
            handle_count: handles.len(),
        });
        if let Err(e) = inserted {
            // The bridge has already queued this decryption; nothing here will consume it
            warn!(%request_id, batch_id, "Oracle reissued a known request id; its queued decryption is orphaned");
            return Err(e);
        }
        self.state
            .cooldown
            .record(*caller, OperationKind::DecryptionRequest, now);

        info!(
            %request_id,
            batch_id,
            handles = handles.len(),
            content_hash = %hex::encode(hash),
            "Batch validation requested"
        );
        self.events.emit(RegistryEvent::DecryptionRequested {
            request_id,
            batch_id,
            content_hash: hash,
        });
        Ok(request_id)
    }

    /// Phase 2: consume the oracle's callback
    ///
    /// Not gated by caller identity; authenticity comes from the proof.
    /// Checks, in order: request exists and is unconsumed, batch content
    /// still matches the pinned hash, proof verifies, cleartexts decode.
    pub fn on_decryption_result(
        &mut self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> RegistryResult<DecryptionOutcome> {
        let request = match self.state.decryption.unprocessed(request_id) {
            Ok(request) => request.clone(),
            Err(e) => {
                warn!(%request_id, "Rejected replayed or unknown decryption callback");
                return Err(e);
            }
        };

        let handles = self.state.ledger.handles(request.batch_id);
        let current_hash = content_hash(&self.state.address, &handles);
        if current_hash != request.content_hash {
            warn!(
                %request_id,
                batch_id = request.batch_id,
                "Batch content drifted since the request"
            );
            return Err(RegistryError::StateMismatch {
                request_id,
                batch_id: request.batch_id,
            });
        }

        self.oracle
            .check_signatures(request_id, cleartexts, proof)
            .map_err(|e| {
                warn!(%request_id, error = %e, "Decryption proof rejected");
                RegistryError::DecryptionFailed(e.to_string())
            })?;

        let types = handles
            .iter()
            .map(|h| {
                h.fhe_type().ok_or_else(|| {
                    RegistryError::DecryptionFailed(format!("handle {} has no known type", h))
                })
            })
            .collect::<RegistryResult<Vec<_>>>()?;
        let values = decode_cleartexts(cleartexts, &types)
            .map_err(|e| RegistryError::DecryptionFailed(e.to_string()))?;
        let result_digest = *blake3::hash(cleartexts).as_bytes();

        self.state.decryption.mark_processed(request_id);

        info!(
            %request_id,
            batch_id = request.batch_id,
            values = values.len(),
            "Decryption result accepted"
        );
        self.events.emit(RegistryEvent::DecryptionCompleted {
            request_id,
            batch_id: request.batch_id,
            result_digest,
        });

        Ok(DecryptionOutcome {
            request_id,
            batch_id: request.batch_id,
            values,
            result_digest,
        })
    }
}
