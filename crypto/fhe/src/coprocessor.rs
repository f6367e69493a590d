//! Local FHE coprocessor
//!
//! Development stand-in for the external coprocessor and its decryption
//! oracle. Plaintexts stay inside this type; the registry only ever sees
//! handles, request ids and signed results.

use parking_lot::RwLock;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    encode_cleartexts, CiphertextHandle, ClearValue, CoprocessorConfig, DecryptionProof,
    FHEError, FHEResult, FheType, KmsCommittee, KmsSigner, OracleBridge, RequestId,
};

/// A decryption request the oracle has accepted but not yet answered
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingDecryption {
    pub request_id: RequestId,
    pub handles: Vec<CiphertextHandle>,
}

/// Signed answer for one decryption request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DecryptionResponse {
    pub request_id: RequestId,
    pub cleartexts: Vec<u8>,
    pub proof: DecryptionProof,
}

/// Serializable coprocessor state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoprocessorSnapshot {
    pub signer_seeds: Vec<[u8; 32]>,
    pub threshold: usize,
    pub plaintexts: Vec<(CiphertextHandle, ClearValue)>,
    pub nonce: u64,
    pub next_request_id: u64,
    pub pending: Vec<PendingDecryption>,
}

struct CoprocessorState {
    plaintexts: HashMap<CiphertextHandle, ClearValue>,
    nonce: u64,
    next_request_id: u64,
    pending: BTreeMap<RequestId, PendingDecryption>,
}

/// In-process coprocessor with a threshold KMS committee
///
/// Cloning shares the same underlying state, so one clone can serve as the
/// registry's bridge while another answers requests.
#[derive(Clone)]
pub struct LocalCoprocessor {
    signers: Arc<Vec<KmsSigner>>,
    committee: Arc<KmsCommittee>,
    state: Arc<RwLock<CoprocessorState>>,
}

impl LocalCoprocessor {
    /// Create a coprocessor with freshly generated KMS signers
    pub fn new(config: &CoprocessorConfig) -> FHEResult<Self> {
        config.validate()?;
        let signers = (0..config.signer_count).map(|_| KmsSigner::generate()).collect();
        Self::with_signers(signers, config.threshold)
    }

    /// Default single-host committee
    pub fn with_defaults() -> FHEResult<Self> {
        Self::new(&CoprocessorConfig::default())
    }

    fn with_signers(signers: Vec<KmsSigner>, threshold: usize) -> FHEResult<Self> {
        let committee = KmsCommittee::new(signers.iter().map(|s| s.public_key()), threshold)?;
        info!(
            signers = signers.len(),
            threshold, "Local coprocessor initialized"
        );

        Ok(Self {
            signers: Arc::new(signers),
            committee: Arc::new(committee),
            state: Arc::new(RwLock::new(CoprocessorState {
                plaintexts: HashMap::new(),
                nonce: 0,
                next_request_id: 1,
                pending: BTreeMap::new(),
            })),
        })
    }

    /// The committee whose signatures this oracle produces
    pub fn committee(&self) -> &KmsCommittee {
        &self.committee
    }

    /// Encrypt a plaintext and return its handle
    pub fn encrypt(&self, value: u64, fhe_type: FheType) -> FHEResult<CiphertextHandle> {
        let clear = ClearValue::new(fhe_type, value)?;

        let mut state = self.state.write();
        state.nonce += 1;

        let mut seed = [0u8; 40];
        rand::thread_rng().fill_bytes(&mut seed[..32]);
        seed[32..].copy_from_slice(&state.nonce.to_le_bytes());
        let handle = CiphertextHandle::derive(&seed, fhe_type);

        state.plaintexts.insert(handle, clear);
        debug!(%handle, %fhe_type, "Encrypted value");
        Ok(handle)
    }

    /// Whether `handle` references a ciphertext held here
    pub fn knows(&self, handle: &CiphertextHandle) -> bool {
        self.state.read().plaintexts.contains_key(handle)
    }

    /// Requests accepted but not yet delivered, in id order
    pub fn pending(&self) -> Vec<PendingDecryption> {
        self.state.read().pending.values().cloned().collect()
    }

    /// Decrypt and sign the result for a pending request
    pub fn fulfill(&self, request_id: RequestId) -> FHEResult<DecryptionResponse> {
        let state = self.state.read();
        let pending = state
            .pending
            .get(&request_id)
            .ok_or(FHEError::UnknownRequest(request_id.0))?;

        let values = pending
            .handles
            .iter()
            .map(|h| {
                state
                    .plaintexts
                    .get(h)
                    .copied()
                    .ok_or_else(|| FHEError::DecryptionFailed(format!("unknown handle {}", h)))
            })
            .collect::<FHEResult<Vec<_>>>()?;
        drop(state);

        let cleartexts = encode_cleartexts(&values);
        let signatures = self
            .signers
            .iter()
            .take(self.committee.threshold())
            .map(|s| s.sign(request_id, &cleartexts))
            .collect();

        debug!(%request_id, values = values.len(), "Fulfilled decryption request");
        Ok(DecryptionResponse {
            request_id,
            cleartexts,
            proof: DecryptionProof::new(signatures),
        })
    }

    /// Drop a request from the pending queue once its callback was delivered
    pub fn mark_delivered(&self, request_id: RequestId) -> bool {
        self.state.write().pending.remove(&request_id).is_some()
    }

    /// Capture the full coprocessor state
    pub fn snapshot(&self) -> CoprocessorSnapshot {
        let state = self.state.read();
        let mut plaintexts: Vec<_> = state.plaintexts.iter().map(|(h, v)| (*h, *v)).collect();
        plaintexts.sort_by_key(|(h, _)| *h);

        CoprocessorSnapshot {
            signer_seeds: self.signers.iter().map(|s| s.seed()).collect(),
            threshold: self.committee.threshold(),
            plaintexts,
            nonce: state.nonce,
            next_request_id: state.next_request_id,
            pending: state.pending.values().cloned().collect(),
        }
    }

    /// Rebuild a coprocessor from a snapshot
    pub fn restore(snapshot: CoprocessorSnapshot) -> FHEResult<Self> {
        let signers = snapshot
            .signer_seeds
            .into_iter()
            .map(KmsSigner::from_seed)
            .collect();
        let coprocessor = Self::with_signers(signers, snapshot.threshold)?;
        {
            let mut state = coprocessor.state.write();
            state.plaintexts = snapshot.plaintexts.into_iter().collect();
            state.nonce = snapshot.nonce;
            state.next_request_id = snapshot.next_request_id;
            state.pending = snapshot
                .pending
                .into_iter()
                .map(|p| (p.request_id, p))
                .collect();
        }
        Ok(coprocessor)
    }
}

impl OracleBridge for LocalCoprocessor {
    fn request_decryption(&self, handles: &[CiphertextHandle]) -> FHEResult<RequestId> {
        let mut state = self.state.write();
        if let Some(unknown) = handles.iter().find(|h| !state.plaintexts.contains_key(*h)) {
            return Err(FHEError::InvalidCiphertext(format!(
                "handle {} is not held by this coprocessor",
                unknown
            )));
        }

        let request_id = RequestId(state.next_request_id);
        state.next_request_id += 1;
        state.pending.insert(
            request_id,
            PendingDecryption {
                request_id,
                handles: handles.to_vec(),
            },
        );

        info!(%request_id, handles = handles.len(), "Decryption requested");
        Ok(request_id)
    }

    fn check_signatures(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> FHEResult<()> {
        if request_id.0 == 0 || request_id.0 >= self.state.read().next_request_id {
            return Err(FHEError::UnknownRequest(request_id.0));
        }
        self.committee.verify(request_id, cleartexts, proof)
    }
}

impl std::fmt::Debug for LocalCoprocessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("LocalCoprocessor")
            .field("signers", &self.signers.len())
            .field("threshold", &self.committee.threshold())
            .field("ciphertexts", &state.plaintexts.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode_cleartexts;

    #[test]
    fn test_encrypt_rejects_overflow() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        assert!(coprocessor.encrypt(256, FheType::Uint8).is_err());

        let handle = coprocessor.encrypt(255, FheType::Uint8).unwrap();
        assert!(coprocessor.knows(&handle));
        assert_eq!(handle.fhe_type(), Some(FheType::Uint8));
    }

    #[test]
    fn test_request_fulfill_verify() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let a = coprocessor.encrypt(42, FheType::Uint32).unwrap();
        let b = coprocessor.encrypt(1, FheType::Bool).unwrap();

        let id = coprocessor.request_decryption(&[a, b]).unwrap();
        assert_eq!(coprocessor.pending().len(), 1);

        let response = coprocessor.fulfill(id).unwrap();
        coprocessor
            .check_signatures(id, &response.cleartexts, &response.proof)
            .unwrap();

        let values =
            decode_cleartexts(&response.cleartexts, &[FheType::Uint32, FheType::Bool]).unwrap();
        assert_eq!(values[0].value, 42);
        assert_eq!(values[1].as_bool(), Some(true));

        assert!(coprocessor.mark_delivered(id));
        assert!(coprocessor.pending().is_empty());
    }

    #[test]
    fn test_request_ids_are_unique() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let first = coprocessor.request_decryption(&[]).unwrap();
        let second = coprocessor.request_decryption(&[]).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_unknown_handle_rejected() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let foreign = CiphertextHandle::derive(b"elsewhere", FheType::Uint8);
        assert!(matches!(
            coprocessor.request_decryption(&[foreign]),
            Err(FHEError::InvalidCiphertext(_))
        ));
    }

    #[test]
    fn test_unissued_request_rejected() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let err = coprocessor
            .check_signatures(RequestId(9), &[], &DecryptionProof::default())
            .unwrap_err();
        assert_eq!(err, FHEError::UnknownRequest(9));
    }

    #[test]
    fn test_snapshot_restore() {
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let handle = coprocessor.encrypt(7, FheType::Uint16).unwrap();
        let id = coprocessor.request_decryption(&[handle]).unwrap();

        let bytes = bincode::serialize(&coprocessor.snapshot()).unwrap();
        let restored = LocalCoprocessor::restore(bincode::deserialize(&bytes).unwrap()).unwrap();

        assert!(restored.knows(&handle));
        let response = restored.fulfill(id).unwrap();
        coprocessor
            .check_signatures(id, &response.cleartexts, &response.proof)
            .unwrap();
    }
}
