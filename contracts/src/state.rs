//! Registry state store
//!
//! All consensus-visible state lives in one plain struct that is handed to
//! each operation, rather than in ambient globals. Everything in it is public;
//! only attestation payloads are encrypted, and those never enter the registry.

use serde::{Deserialize, Serialize};

use crate::access::AccessRegistry;
use crate::address::Address;
use crate::batch::BatchLedger;
use crate::cooldown::CooldownGuard;
use crate::decryption::DecryptionCoordinator;
use crate::errors::{RegistryError, RegistryResult};
use crate::pause::PauseSwitch;

/// Full public state of one registry instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryState {
    /// Identity of this registry, bound into every content hash
    pub address: Address,
    pub access: AccessRegistry,
    pub pause: PauseSwitch,
    pub cooldown: CooldownGuard,
    pub ledger: BatchLedger,
    pub decryption: DecryptionCoordinator,
}

impl RegistryState {
    /// Fresh state: batch 1 active, no providers, unpaused
    pub fn new(address: Address, owner: Address, cooldown_seconds: u64, now: u64) -> RegistryResult<Self> {
        Ok(Self {
            address,
            access: AccessRegistry::new(owner),
            pause: PauseSwitch::default(),
            cooldown: CooldownGuard::new(cooldown_seconds)?,
            ledger: BatchLedger::new(now),
            decryption: DecryptionCoordinator::default(),
        })
    }

    /// Commitment to the whole state
    pub fn state_root(&self) -> RegistryResult<[u8; 32]> {
        let encoded = self.serialize()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.address.as_bytes());
        hasher.update(&encoded);
        Ok(*hasher.finalize().as_bytes())
    }

    /// Serialize state for persistence
    pub fn serialize(&self) -> RegistryResult<Vec<u8>> {
        bincode::serialize(self).map_err(|e| RegistryError::SerializationError(e.to_string()))
    }

    /// Deserialize state from bytes
    pub fn deserialize(data: &[u8]) -> RegistryResult<Self> {
        bincode::deserialize(data).map_err(|e| RegistryError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> RegistryState {
        RegistryState::new(
            Address::from_label("registry"),
            Address::from_label("owner"),
            60,
            1_000,
        )
        .unwrap()
    }

    #[test]
    fn test_state_creation() {
        let state = state();
        assert_eq!(state.ledger.current_batch_id(), 1);
        assert!(!state.pause.is_paused());
        assert_eq!(state.cooldown.cooldown_seconds(), 60);
        assert_eq!(state.decryption.len(), 0);
    }

    #[test]
    fn test_zero_cooldown_rejected() {
        let result = RegistryState::new(Address::ZERO, Address::ZERO, 0, 0);
        assert_eq!(result.unwrap_err(), RegistryError::InvalidCooldown);
    }

    #[test]
    fn test_state_serialization() {
        let state = state();
        let bytes = state.serialize().unwrap();
        let restored = RegistryState::deserialize(&bytes).unwrap();
        assert_eq!(state, restored);
        assert_eq!(state.state_root().unwrap(), restored.state_root().unwrap());
    }

    #[test]
    fn test_state_root_tracks_changes() {
        let mut state = state();
        let before = state.state_root().unwrap();
        let owner = state.access.owner();
        state
            .access
            .add_provider(&owner, Address::from_label("p"))
            .unwrap();
        assert_ne!(before, state.state_root().unwrap());
    }
}
