//! KMS signer keys and decryption proofs
//!
//! The oracle's key-management committee signs every decryption result. A
//! proof is accepted once a threshold of distinct committee members signed
//! the digest of `(request_id, cleartexts)`.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::{FHEError, FHEResult, RequestId};

/// Domain separator for decryption result digests
pub const DECRYPTION_DOMAIN: &[u8] = b"veil.kms.decryption.v1";

/// Digest a KMS signer commits to for one decryption result
pub fn decryption_digest(request_id: RequestId, cleartexts: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(DECRYPTION_DOMAIN);
    hasher.update(&request_id.0.to_le_bytes());
    hasher.update(&(cleartexts.len() as u64).to_le_bytes());
    hasher.update(cleartexts);
    *hasher.finalize().as_bytes()
}

/// Public key of a KMS committee member
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KmsPublicKey([u8; 32]);

impl KmsPublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    fn verifying_key(&self) -> FHEResult<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|e| FHEError::InvalidKey(e.to_string()))
    }
}

impl fmt::Debug for KmsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KmsPublicKey({})", &hex::encode(self.0)[..16])
    }
}

impl fmt::Display for KmsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Signing key held by one KMS committee member
pub struct KmsSigner {
    signing_key: SigningKey,
}

impl KmsSigner {
    /// Generate a fresh signer
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Rebuild a signer from its 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Secret seed, for persistence of development committees only
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn public_key(&self) -> KmsPublicKey {
        KmsPublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a decryption result
    pub fn sign(&self, request_id: RequestId, cleartexts: &[u8]) -> KmsSignature {
        let digest = decryption_digest(request_id, cleartexts);
        let signature = self.signing_key.sign(&digest);
        KmsSignature {
            signer: self.public_key(),
            signature: signature.to_bytes().to_vec(),
        }
    }
}

impl fmt::Debug for KmsSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsSigner")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// One committee member's signature over a decryption result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsSignature {
    pub signer: KmsPublicKey,
    /// Ed25519 signature bytes (64)
    pub signature: Vec<u8>,
}

impl KmsSignature {
    /// Verify against the digest of `(request_id, cleartexts)`
    pub fn verify(&self, request_id: RequestId, cleartexts: &[u8]) -> FHEResult<()> {
        let bytes: [u8; 64] = self.signature.as_slice().try_into().map_err(|_| {
            FHEError::InvalidSignature(format!(
                "signature from {:?} has {} bytes",
                self.signer,
                self.signature.len()
            ))
        })?;
        let signature = Signature::from_bytes(&bytes);
        let digest = decryption_digest(request_id, cleartexts);
        self.signer
            .verifying_key()?
            .verify(&digest, &signature)
            .map_err(|_| {
                FHEError::InvalidSignature(format!("signature from {:?} rejected", self.signer))
            })
    }
}

/// Proof that a cleartext set is the genuine decryption for a request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionProof {
    pub signatures: Vec<KmsSignature>,
}

impl DecryptionProof {
    pub fn new(signatures: Vec<KmsSignature>) -> Self {
        Self { signatures }
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// The set of KMS members whose signatures count toward the threshold
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KmsCommittee {
    members: BTreeSet<KmsPublicKey>,
    threshold: usize,
}

impl KmsCommittee {
    pub fn new(members: impl IntoIterator<Item = KmsPublicKey>, threshold: usize) -> FHEResult<Self> {
        let members: BTreeSet<_> = members.into_iter().collect();
        if threshold == 0 || threshold > members.len() {
            return Err(FHEError::ConfigError(format!(
                "threshold {} invalid for {} KMS signers",
                threshold,
                members.len()
            )));
        }
        Ok(Self { members, threshold })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn members(&self) -> impl Iterator<Item = &KmsPublicKey> {
        self.members.iter()
    }

    pub fn is_member(&self, key: &KmsPublicKey) -> bool {
        self.members.contains(key)
    }

    /// Check that at least `threshold` distinct members signed the result
    ///
    /// Signatures from non-members and duplicates do not count. A single
    /// invalid signature from a member fails the whole proof.
    pub fn verify(
        &self,
        request_id: RequestId,
        cleartexts: &[u8],
        proof: &DecryptionProof,
    ) -> FHEResult<()> {
        let mut signers = BTreeSet::new();
        for sig in &proof.signatures {
            if !self.is_member(&sig.signer) || signers.contains(&sig.signer) {
                continue;
            }
            sig.verify(request_id, cleartexts)?;
            signers.insert(sig.signer);
        }

        if signers.len() < self.threshold {
            return Err(FHEError::ThresholdNotMet {
                got: signers.len(),
                need: self.threshold,
            });
        }
        Ok(())
    }
}
