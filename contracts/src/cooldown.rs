//! Per-principal rate limiting

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::access::AccessRegistry;
use crate::address::Address;
use crate::errors::{RegistryError, RegistryResult};

/// Operation kinds that are rate limited independently
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Submission,
    DecryptionRequest,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Submission => f.write_str("submission"),
            OperationKind::DecryptionRequest => f.write_str("decryption-request"),
        }
    }
}

/// Last time a principal performed each guarded operation
///
/// `None` means the principal never performed it, which never blocks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownState {
    pub last_submission_time: Option<u64>,
    pub last_decryption_request_time: Option<u64>,
}

impl CooldownState {
    pub fn last(&self, kind: OperationKind) -> Option<u64> {
        match kind {
            OperationKind::Submission => self.last_submission_time,
            OperationKind::DecryptionRequest => self.last_decryption_request_time,
        }
    }

    fn set(&mut self, kind: OperationKind, now: u64) {
        match kind {
            OperationKind::Submission => self.last_submission_time = Some(now),
            OperationKind::DecryptionRequest => self.last_decryption_request_time = Some(now),
        }
    }
}

/// Configurable interval plus per-principal timestamps
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownGuard {
    cooldown_seconds: u64,
    states: BTreeMap<Address, CooldownState>,
}

impl CooldownGuard {
    pub fn new(cooldown_seconds: u64) -> RegistryResult<Self> {
        if cooldown_seconds == 0 {
            return Err(RegistryError::InvalidCooldown);
        }
        Ok(Self {
            cooldown_seconds,
            states: BTreeMap::new(),
        })
    }

    pub fn cooldown_seconds(&self) -> u64 {
        self.cooldown_seconds
    }

    pub fn state(&self, principal: &Address) -> CooldownState {
        self.states.get(principal).copied().unwrap_or_default()
    }

    pub fn states(&self) -> impl Iterator<Item = (&Address, &CooldownState)> {
        self.states.iter()
    }

    /// Fails while `now < last + cooldown`
    pub fn check(&self, principal: &Address, kind: OperationKind, now: u64) -> RegistryResult<()> {
        if let Some(last) = self.state(principal).last(kind) {
            let ready_at = last.saturating_add(self.cooldown_seconds);
            if now < ready_at {
                return Err(RegistryError::CooldownActive {
                    principal: *principal,
                    kind,
                    ready_at,
                });
            }
        }
        Ok(())
    }

    /// Record a completed operation. Call only after every other check passed.
    pub fn record(&mut self, principal: Address, kind: OperationKind, now: u64) {
        self.states.entry(principal).or_default().set(kind, now);
    }

    /// Change the interval; returns the previous value
    pub fn set_cooldown_seconds(
        &mut self,
        access: &AccessRegistry,
        caller: &Address,
        seconds: u64,
    ) -> RegistryResult<u64> {
        access.ensure_owner(caller)?;
        if seconds == 0 {
            return Err(RegistryError::InvalidCooldown);
        }
        let old = self.cooldown_seconds;
        self.cooldown_seconds = seconds;
        Ok(old)
    }
}
