//! Owner and provider bookkeeping

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::address::Address;
use crate::errors::{RegistryError, RegistryResult};

/// Role state: exactly one owner and a set of providers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRegistry {
    owner: Address,
    providers: BTreeSet<Address>,
}

impl AccessRegistry {
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            providers: BTreeSet::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn is_owner(&self, who: &Address) -> bool {
        self.owner == *who
    }

    pub fn is_provider(&self, who: &Address) -> bool {
        self.providers.contains(who)
    }

    /// Providers in address order
    pub fn providers(&self) -> impl Iterator<Item = &Address> {
        self.providers.iter()
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    pub fn ensure_owner(&self, caller: &Address) -> RegistryResult<()> {
        if !self.is_owner(caller) {
            debug!(%caller, "Owner check failed");
            return Err(RegistryError::NotOwner { caller: *caller });
        }
        Ok(())
    }

    pub fn ensure_provider(&self, caller: &Address) -> RegistryResult<()> {
        if !self.is_provider(caller) {
            debug!(%caller, "Provider check failed");
            return Err(RegistryError::NotProvider { caller: *caller });
        }
        Ok(())
    }

    /// Replace the owner; returns the previous one
    ///
    /// Any target is accepted, including one nobody controls.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: Address,
    ) -> RegistryResult<Address> {
        self.ensure_owner(caller)?;
        let previous = self.owner;
        self.owner = new_owner;
        Ok(previous)
    }

    /// Returns whether membership changed
    pub fn add_provider(&mut self, caller: &Address, provider: Address) -> RegistryResult<bool> {
        self.ensure_owner(caller)?;
        Ok(self.providers.insert(provider))
    }

    /// Returns whether membership changed
    pub fn remove_provider(&mut self, caller: &Address, provider: &Address) -> RegistryResult<bool> {
        self.ensure_owner(caller)?;
        Ok(self.providers.remove(provider))
    }
}
