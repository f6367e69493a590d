//! The attestation registry
//!
//! `AttestationRegistry` owns the registry state, the oracle bridge and a
//! clock, and exposes every externally callable operation. Calls take
//! `&mut self`, so execution is serialized: each call finishes, with all
//! invariants restored, before the next one starts.
//!
//! Guards run in a fixed order: authorization, availability (pause),
//! rate limit (cooldown), then lifecycle. Every guard runs before the first
//! mutation, so a failed call changes nothing.

use tracing::info;
use veil_fhe::{OracleBridge, RequestId};

use crate::address::Address;
use crate::batch::{Batch, BatchId, BatchTransition, SubmissionRecord};
use crate::clock::{Clock, SystemClock};
use crate::cooldown::CooldownState;
use crate::decryption::DecryptionRequest;
use crate::errors::RegistryResult;
use crate::events::{EventLog, RegistryEvent};
use crate::state::RegistryState;

/// Default cooldown between guarded operations of one principal
pub const DEFAULT_COOLDOWN_SECONDS: u64 = 60;

/// Deployment parameters for a new registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Registry identity, bound into content hashes
    pub address: Address,
    /// Initial owner
    pub owner: Address,
    /// Initial cooldown interval in seconds
    pub cooldown_seconds: u64,
}

impl RegistryConfig {
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            cooldown_seconds: DEFAULT_COOLDOWN_SECONDS,
        }
    }

    pub fn with_cooldown(mut self, seconds: u64) -> Self {
        self.cooldown_seconds = seconds;
        self
    }
}

/// Attestation registry bound to an oracle bridge and a time source
pub struct AttestationRegistry<O: OracleBridge, C: Clock = SystemClock> {
    pub(crate) state: RegistryState,
    pub(crate) oracle: O,
    pub(crate) clock: C,
    pub(crate) events: EventLog,
}

impl<O: OracleBridge, C: Clock> AttestationRegistry<O, C> {
    /// Deploy a fresh registry: batch 1 active, no providers
    pub fn new(config: RegistryConfig, oracle: O, clock: C) -> RegistryResult<Self> {
        let now = clock.now();
        let state = RegistryState::new(config.address, config.owner, config.cooldown_seconds, now)?;
        info!(
            address = %config.address,
            owner = %config.owner,
            cooldown = config.cooldown_seconds,
            "Registry deployed"
        );
        Ok(Self::from_snapshot(state, oracle, clock))
    }

    /// Resume a registry from previously persisted state
    pub fn from_snapshot(state: RegistryState, oracle: O, clock: C) -> Self {
        Self {
            state,
            oracle,
            clock,
            events: EventLog::default(),
        }
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    /// Copy of the full public state, for persistence
    pub fn snapshot(&self) -> RegistryState {
        self.state.clone()
    }

    pub fn into_state(self) -> RegistryState {
        self.state
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn address(&self) -> Address {
        self.state.address
    }

    /// Events emitted since the last drain
    pub fn events(&self) -> &[RegistryEvent] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<RegistryEvent> {
        self.events.drain()
    }

    // ---------------------------------------------------------------------
    // Access control
    // ---------------------------------------------------------------------

    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> RegistryResult<()> {
        let previous = self.state.access.transfer_ownership(caller, new_owner)?;
        self.events.emit(RegistryEvent::OwnershipTransferred {
            previous,
            new_owner,
        });
        Ok(())
    }

    /// Idempotent; emits only when the provider was not yet registered
    pub fn add_provider(&mut self, caller: &Address, provider: Address) -> RegistryResult<()> {
        if self.state.access.add_provider(caller, provider)? {
            self.events.emit(RegistryEvent::ProviderAdded { provider });
        }
        Ok(())
    }

    /// Idempotent; emits only when the provider was registered
    pub fn remove_provider(&mut self, caller: &Address, provider: &Address) -> RegistryResult<()> {
        if self.state.access.remove_provider(caller, provider)? {
            self.events.emit(RegistryEvent::ProviderRemoved {
                provider: *provider,
            });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Pause switch
    // ---------------------------------------------------------------------

    pub fn pause(&mut self, caller: &Address) -> RegistryResult<()> {
        self.state.pause.pause(&self.state.access, caller)?;
        self.events.emit(RegistryEvent::Paused { by: *caller });
        Ok(())
    }

    /// Clear the pause flag. Always permitted for the owner; `Unpaused` is
    /// emitted only when the registry was actually paused.
    pub fn unpause(&mut self, caller: &Address) -> RegistryResult<()> {
        if self.state.pause.unpause(&self.state.access, caller)? {
            self.events.emit(RegistryEvent::Unpaused { by: *caller });
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cooldown
    // ---------------------------------------------------------------------

    pub fn set_cooldown_seconds(&mut self, caller: &Address, seconds: u64) -> RegistryResult<()> {
        self.state.access.ensure_owner(caller)?;
        self.state.pause.ensure_not_paused()?;
        let old_seconds =
            self.state
                .cooldown
                .set_cooldown_seconds(&self.state.access, caller, seconds)?;
        self.events.emit(RegistryEvent::CooldownUpdated {
            old_seconds,
            new_seconds: seconds,
        });
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Batch lifecycle
    // ---------------------------------------------------------------------

    /// Close the current batch and open the next one
    pub fn close_current_batch(&mut self, caller: &Address) -> RegistryResult<BatchTransition> {
        self.state.access.ensure_owner(caller)?;
        self.state.pause.ensure_not_paused()?;
        let now = self.clock.now();
        let transition = self
            .state
            .ledger
            .close_current_batch(&self.state.access, caller, now)?;

        info!(
            closed = transition.closed.id,
            opened = transition.opened.id,
            submissions = self.state.ledger.submissions(transition.closed.id).len(),
            "Batch closed"
        );
        self.events.emit(RegistryEvent::BatchClosed {
            batch_id: transition.closed.id,
            closed_at: now,
        });
        self.events.emit(RegistryEvent::BatchOpened {
            batch_id: transition.opened.id,
            created_at: now,
        });
        Ok(transition)
    }

    // ---------------------------------------------------------------------
    // Public views
    // ---------------------------------------------------------------------

    pub fn owner(&self) -> Address {
        self.state.access.owner()
    }

    pub fn is_provider(&self, who: &Address) -> bool {
        self.state.access.is_provider(who)
    }

    pub fn providers(&self) -> Vec<Address> {
        self.state.access.providers().copied().collect()
    }

    pub fn is_paused(&self) -> bool {
        self.state.pause.is_paused()
    }

    pub fn cooldown_seconds(&self) -> u64 {
        self.state.cooldown.cooldown_seconds()
    }

    pub fn cooldown_state(&self, principal: &Address) -> CooldownState {
        self.state.cooldown.state(principal)
    }

    pub fn current_batch_id(&self) -> BatchId {
        self.state.ledger.current_batch_id()
    }

    pub fn current_batch(&self) -> Option<&Batch> {
        self.state.ledger.current_batch()
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.state.ledger.batch(id)
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.state.ledger.batches().copied().collect()
    }

    pub fn submissions(&self, id: BatchId) -> &[SubmissionRecord] {
        self.state.ledger.submissions(id)
    }

    pub fn decryption_request(&self, id: RequestId) -> Option<&DecryptionRequest> {
        self.state.decryption.get(id)
    }

    pub fn decryption_requests(&self) -> Vec<DecryptionRequest> {
        self.state.decryption.requests().cloned().collect()
    }

    /// Requests whose callback has not been consumed yet
    pub fn pending_requests(&self) -> Vec<DecryptionRequest> {
        self.state.decryption.pending().cloned().collect()
    }
}

impl<O: OracleBridge + std::fmt::Debug, C: Clock> std::fmt::Debug for AttestationRegistry<O, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttestationRegistry")
            .field("address", &self.state.address)
            .field("owner", &self.state.access.owner())
            .field("current_batch", &self.state.ledger.current_batch_id())
            .field("paused", &self.state.pause.is_paused())
            .field("oracle", &self.oracle)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::errors::RegistryError;

    #[test]
    fn test_deploy_state() {
        let fx = Fixture::new();
        assert_eq!(fx.registry.owner(), fx.owner);
        assert_eq!(fx.registry.current_batch_id(), 1);
        assert!(fx.registry.current_batch().unwrap().active);
        assert_eq!(fx.registry.cooldown_seconds(), COOLDOWN);
        assert_eq!(fx.registry.providers(), vec![fx.provider]);
    }

    #[test]
    fn test_provider_events_only_on_change() {
        let mut fx = Fixture::new();
        let other = Address::from_label("other");

        fx.registry.add_provider(&fx.owner, other).unwrap();
        fx.registry.add_provider(&fx.owner, other).unwrap();
        fx.registry.remove_provider(&fx.owner, &other).unwrap();
        fx.registry.remove_provider(&fx.owner, &other).unwrap();

        assert_eq!(
            fx.registry.drain_events(),
            vec![
                RegistryEvent::ProviderAdded { provider: other },
                RegistryEvent::ProviderRemoved { provider: other },
            ]
        );
    }

    #[test]
    fn test_transfer_ownership_emits() {
        let mut fx = Fixture::new();
        let heir = Address::from_label("heir");

        fx.registry.transfer_ownership(&fx.owner, heir).unwrap();
        assert_eq!(fx.registry.owner(), heir);
        assert_eq!(
            fx.registry.drain_events(),
            vec![RegistryEvent::OwnershipTransferred {
                previous: fx.owner,
                new_owner: heir,
            }]
        );

        assert!(matches!(
            fx.registry.pause(&fx.owner),
            Err(RegistryError::NotOwner { .. })
        ));
    }

    #[test]
    fn test_set_cooldown_emits_old_and_new() {
        let mut fx = Fixture::new();
        fx.registry.set_cooldown_seconds(&fx.owner, 120).unwrap();
        assert_eq!(
            fx.registry.drain_events(),
            vec![RegistryEvent::CooldownUpdated {
                old_seconds: COOLDOWN,
                new_seconds: 120,
            }]
        );
        assert_eq!(
            fx.registry.set_cooldown_seconds(&fx.owner, 0),
            Err(RegistryError::InvalidCooldown)
        );
        assert!(fx.registry.events().is_empty());
    }

    #[test]
    fn test_close_emits_closed_then_opened() {
        let mut fx = Fixture::new();
        fx.clock.advance(10);

        let transition = fx.registry.close_current_batch(&fx.owner).unwrap();
        assert_eq!(transition.opened.id, 2);
        assert_eq!(
            fx.registry.drain_events(),
            vec![
                RegistryEvent::BatchClosed {
                    batch_id: 1,
                    closed_at: START + 10,
                },
                RegistryEvent::BatchOpened {
                    batch_id: 2,
                    created_at: START + 10,
                },
            ]
        );
    }

    #[test]
    fn test_batch_ids_increase_with_one_active() {
        let mut fx = Fixture::new();
        for expected in 2..=6 {
            fx.registry.close_current_batch(&fx.owner).unwrap();
            assert_eq!(fx.registry.current_batch_id(), expected);
            assert_eq!(fx.registry.batches().iter().filter(|b| b.active).count(), 1);
        }
        let ids: Vec<_> = fx.registry.batches().iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_batch_and_cooldown_changes_blocked_while_paused() {
        let mut fx = Fixture::new();
        fx.registry.pause(&fx.owner).unwrap();
        fx.registry.drain_events();

        assert_eq!(
            fx.registry.close_current_batch(&fx.owner),
            Err(RegistryError::PausedError)
        );
        assert_eq!(
            fx.registry.set_cooldown_seconds(&fx.owner, 5),
            Err(RegistryError::PausedError)
        );
        assert_eq!(fx.registry.current_batch_id(), 1);
        assert_eq!(fx.registry.cooldown_seconds(), COOLDOWN);
        assert!(fx.registry.drain_events().is_empty());

        // Non-owners still see the authorization failure first
        assert_eq!(
            fx.registry.close_current_batch(&fx.provider),
            Err(RegistryError::NotOwner {
                caller: fx.provider
            })
        );
        assert_eq!(
            fx.registry.set_cooldown_seconds(&fx.provider, 5),
            Err(RegistryError::NotOwner {
                caller: fx.provider
            })
        );

        // Access management stays available
        fx.registry
            .add_provider(&fx.owner, Address::from_label("late"))
            .unwrap();

        fx.registry.unpause(&fx.owner).unwrap();
        assert_eq!(fx.registry.close_current_batch(&fx.owner).unwrap().opened.id, 2);
        fx.registry.set_cooldown_seconds(&fx.owner, 5).unwrap();
    }

    #[test]
    fn test_unpause_without_pause_is_silent() {
        let mut fx = Fixture::new();
        fx.registry.unpause(&fx.owner).unwrap();
        assert!(fx.registry.drain_events().is_empty());

        fx.registry.pause(&fx.owner).unwrap();
        fx.registry.unpause(&fx.owner).unwrap();
        assert_eq!(
            fx.registry.drain_events(),
            vec![
                RegistryEvent::Paused { by: fx.owner },
                RegistryEvent::Unpaused { by: fx.owner },
            ]
        );
    }
}
