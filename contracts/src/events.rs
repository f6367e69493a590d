//! Registry notifications

use serde::{Deserialize, Serialize};
use tracing::info;
use veil_fhe::{CiphertextHandle, RequestId};

use crate::address::Address;
use crate::batch::BatchId;

/// Every externally observable notification the registry emits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistryEvent {
    OwnershipTransferred {
        previous: Address,
        new_owner: Address,
    },
    ProviderAdded {
        provider: Address,
    },
    ProviderRemoved {
        provider: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
    CooldownUpdated {
        old_seconds: u64,
        new_seconds: u64,
    },
    BatchClosed {
        batch_id: BatchId,
        closed_at: u64,
    },
    BatchOpened {
        batch_id: BatchId,
        created_at: u64,
    },
    AttestationSubmitted {
        provider: Address,
        batch_id: BatchId,
        handle: CiphertextHandle,
    },
    DecryptionRequested {
        request_id: RequestId,
        batch_id: BatchId,
        content_hash: [u8; 32],
    },
    DecryptionCompleted {
        request_id: RequestId,
        batch_id: BatchId,
        result_digest: [u8; 32],
    },
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::OwnershipTransferred { .. } => "ownership-transferred",
            RegistryEvent::ProviderAdded { .. } => "provider-added",
            RegistryEvent::ProviderRemoved { .. } => "provider-removed",
            RegistryEvent::Paused { .. } => "paused",
            RegistryEvent::Unpaused { .. } => "unpaused",
            RegistryEvent::CooldownUpdated { .. } => "cooldown-updated",
            RegistryEvent::BatchClosed { .. } => "batch-closed",
            RegistryEvent::BatchOpened { .. } => "batch-opened",
            RegistryEvent::AttestationSubmitted { .. } => "attestation-submitted",
            RegistryEvent::DecryptionRequested { .. } => "decryption-requested",
            RegistryEvent::DecryptionCompleted { .. } => "decryption-completed",
        }
    }
}

/// Append-only buffer of emitted events, drained by the host
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<RegistryEvent>,
}

impl EventLog {
    pub fn emit(&mut self, event: RegistryEvent) {
        info!(event = event.name(), details = ?event, "Registry event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[RegistryEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<RegistryEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_and_drain() {
        let mut log = EventLog::default();
        log.emit(RegistryEvent::Paused { by: Address::ZERO });
        log.emit(RegistryEvent::Unpaused { by: Address::ZERO });
        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].name(), "paused");

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }
}
