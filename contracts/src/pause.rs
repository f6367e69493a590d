//! Global halt switch

use serde::{Deserialize, Serialize};

use crate::access::AccessRegistry;
use crate::address::Address;
use crate::errors::{RegistryError, RegistryResult};

/// Pause flag gating submissions and decryption requests
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PauseSwitch {
    paused: bool,
}

impl PauseSwitch {
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Gate for operations that must not run while paused
    pub fn ensure_not_paused(&self) -> RegistryResult<()> {
        if self.paused {
            return Err(RegistryError::PausedError);
        }
        Ok(())
    }

    /// Pausing an already paused registry is an error
    pub fn pause(&mut self, access: &AccessRegistry, caller: &Address) -> RegistryResult<()> {
        access.ensure_owner(caller)?;
        self.ensure_not_paused()?;
        self.paused = true;
        Ok(())
    }

    /// Always permitted for the owner; returns whether the flag changed
    pub fn unpause(&mut self, access: &AccessRegistry, caller: &Address) -> RegistryResult<bool> {
        access.ensure_owner(caller)?;
        let was_paused = self.paused;
        self.paused = false;
        Ok(was_paused)
    }
}
