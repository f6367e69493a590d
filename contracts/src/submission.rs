//! Admission-controlled attestation submission

use tracing::{debug, info};
use veil_fhe::{CiphertextHandle, OracleBridge};

use crate::address::Address;
use crate::batch::SubmissionRecord;
use crate::clock::Clock;
use crate::cooldown::OperationKind;
use crate::errors::{RegistryError, RegistryResult};
use crate::events::RegistryEvent;
use crate::registry::AttestationRegistry;

/// Admission check on the handle itself; its contents stay opaque
pub fn validate_handle(handle: &CiphertextHandle) -> RegistryResult<()> {
    if !handle.is_initialized() {
        return Err(RegistryError::InvalidCiphertext(
            "handle is uninitialized".to_string(),
        ));
    }
    if handle.fhe_type().is_none() {
        return Err(RegistryError::InvalidCiphertext(format!(
            "handle {} carries an unknown type tag",
            handle
        )));
    }
    Ok(())
}

impl<O: OracleBridge, C: Clock> AttestationRegistry<O, C> {
    /// Record a provider's encrypted attestation against the current batch
    ///
    /// Guard order: provider, not paused, submission cooldown, current batch
    /// active, well-formed handle.
    pub fn submit(
        &mut self,
        caller: &Address,
        handle: CiphertextHandle,
    ) -> RegistryResult<SubmissionRecord> {
        let now = self.clock.now();

        self.state.access.ensure_provider(caller)?;
        self.state.pause.ensure_not_paused()?;
        self.state
            .cooldown
            .check(caller, OperationKind::Submission, now)?;
        let batch_id = self.state.ledger.ensure_current_active()?.id;
        validate_handle(&handle)?;
        debug!(provider = %caller, batch_id, "Submission admitted");

        let record = SubmissionRecord {
            provider: *caller,
            batch_id,
            handle,
            timestamp: now,
        };
        self.state.ledger.append(record)?;
        self.state
            .cooldown
            .record(*caller, OperationKind::Submission, now);

        info!(provider = %caller, batch_id, %handle, "Attestation submitted");
        self.events.emit(RegistryEvent::AttestationSubmitted {
            provider: *caller,
            batch_id,
            handle,
        });
        Ok(record)
    }
}
