//! Oracle-side relayer
//!
//! Watches the local coprocessor's pending queue, fulfils each request and
//! delivers the signed result into the registry's callback. The registry is
//! shared behind a mutex, so deliveries interleave with other calls but
//! never overlap them.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use veil_fhe::{FHEError, LocalCoprocessor, RequestId};
use veil_registry::{AttestationRegistry, Clock, DecryptionOutcome, RegistryError};

/// Registry shared between command code and the relayer task
pub type SharedRegistry<C> = Arc<Mutex<AttestationRegistry<LocalCoprocessor, C>>>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Coprocessor could not fulfil: {0}")]
    Oracle(#[from] FHEError),

    #[error("Registry rejected callback: {0}")]
    Registry(#[from] RegistryError),
}

/// Result of delivering one request
#[derive(Debug)]
pub struct Delivery {
    pub request_id: RequestId,
    pub result: Result<DecryptionOutcome, RelayError>,
}

/// Fulfil and deliver every pending request once
///
/// Accepted requests leave the queue, and so do requests the registry can
/// never accept: already consumed ones and ones whose batch content no longer
/// matches (submission lists only grow). Anything else stays pending and is
/// retried on the next pass.
pub fn deliver_pending<C: Clock>(
    coprocessor: &LocalCoprocessor,
    registry: &mut AttestationRegistry<LocalCoprocessor, C>,
) -> Vec<Delivery> {
    coprocessor
        .pending()
        .into_iter()
        .map(|pending| {
            let request_id = pending.request_id;
            let result = coprocessor
                .fulfill(request_id)
                .map_err(RelayError::from)
                .and_then(|response| {
                    registry
                        .on_decryption_result(request_id, &response.cleartexts, &response.proof)
                        .map_err(RelayError::from)
                });

            match &result {
                Ok(outcome) => {
                    coprocessor.mark_delivered(request_id);
                    info!(%request_id, batch_id = outcome.batch_id, "Callback delivered");
                }
                Err(RelayError::Registry(RegistryError::ReplayAttempt { .. })) => {
                    coprocessor.mark_delivered(request_id);
                    debug!(%request_id, "Request already consumed; dropped from queue");
                }
                Err(RelayError::Registry(RegistryError::StateMismatch { batch_id, .. })) => {
                    coprocessor.mark_delivered(request_id);
                    warn!(%request_id, batch_id, "Batch content changed; request dropped from queue");
                }
                Err(e) => warn!(%request_id, error = %e, "Callback failed; will retry"),
            }

            Delivery { request_id, result }
        })
        .collect()
}

/// Counters reported when the relayer stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayerStats {
    pub ticks: u64,
    pub delivered: u64,
    pub failed: u64,
}

pub struct Relayer<C: Clock> {
    coprocessor: LocalCoprocessor,
    registry: SharedRegistry<C>,
    poll_interval: Duration,
}

impl<C: Clock + 'static> Relayer<C> {
    pub fn new(coprocessor: LocalCoprocessor, registry: SharedRegistry<C>, poll_interval: Duration) -> Self {
        Self {
            coprocessor,
            registry,
            poll_interval,
        }
    }

    /// One polling pass
    pub fn tick(&self) -> Vec<Delivery> {
        let mut registry = self.registry.lock();
        deliver_pending(&self.coprocessor, &mut registry)
    }

    /// Poll until `shutdown` flips to true, then drain once more
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> RelayerStats {
        let mut stats = RelayerStats::default();
        let mut ticker = tokio::time::interval(self.poll_interval);
        info!(interval_ms = self.poll_interval.as_millis() as u64, "Relayer started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.record(&mut stats);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.record(&mut stats);
        info!(
            ticks = stats.ticks,
            delivered = stats.delivered,
            failed = stats.failed,
            "Relayer stopped"
        );
        stats
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<RelayerStats> {
        tokio::spawn(self.run(shutdown))
    }

    fn record(&self, stats: &mut RelayerStats) {
        stats.ticks += 1;
        for delivery in self.tick() {
            match delivery.result {
                Ok(_) => stats.delivered += 1,
                Err(_) => stats.failed += 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veil_fhe::FheType;
    use veil_registry::{Address, ManualClock, RegistryConfig};

    const COOLDOWN: u64 = 10;

    fn setup() -> (SharedRegistry<ManualClock>, LocalCoprocessor, ManualClock, Address) {
        let owner = Address::from_label("owner");
        let provider = Address::from_label("provider");
        let coprocessor = LocalCoprocessor::with_defaults().unwrap();
        let clock = ManualClock::new(1_000);
        let config = RegistryConfig::new(Address::from_label("registry"), owner)
            .with_cooldown(COOLDOWN);
        let mut registry =
            AttestationRegistry::new(config, coprocessor.clone(), clock.clone()).unwrap();

        registry.add_provider(&owner, provider).unwrap();
        let handle = coprocessor.encrypt(7, FheType::Uint16).unwrap();
        registry.submit(&provider, handle).unwrap();
        registry.close_current_batch(&owner).unwrap();

        (Arc::new(Mutex::new(registry)), coprocessor, clock, owner)
    }

    #[test]
    fn test_deliver_pending_consumes_queue() {
        let (registry, coprocessor, _, owner) = setup();
        let id = registry.lock().request_batch_validation(&owner, 1).unwrap();

        let deliveries = deliver_pending(&coprocessor, &mut registry.lock());
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].request_id, id);
        let outcome = deliveries[0].result.as_ref().unwrap();
        assert_eq!(outcome.values[0].value, 7);

        assert!(coprocessor.pending().is_empty());
        assert!(registry.lock().decryption_request(id).unwrap().processed);
        assert!(deliver_pending(&coprocessor, &mut registry.lock()).is_empty());
    }

    #[test]
    fn test_requests_delivered_in_id_order() {
        let (registry, coprocessor, clock, owner) = setup();
        let id = registry.lock().request_batch_validation(&owner, 1).unwrap();

        clock.advance(COOLDOWN);
        let second = registry.lock().request_batch_validation(&owner, 1).unwrap();
        let deliveries = deliver_pending(&coprocessor, &mut registry.lock());
        let ids: Vec<_> = deliveries.iter().map(|d| d.request_id).collect();
        assert_eq!(ids, vec![id, second]);
        assert!(deliveries.iter().all(|d| d.result.is_ok()));
    }

    #[test]
    fn test_stale_request_dropped_from_queue() {
        let (registry, coprocessor, clock, owner) = setup();
        let id = registry.lock().request_batch_validation(&owner, 1).unwrap();

        // Resuming under another identity changes every content hash
        let mut state = registry.lock().snapshot();
        state.address = Address::from_label("elsewhere");
        let mut moved = AttestationRegistry::from_snapshot(state, coprocessor.clone(), clock);

        let deliveries = deliver_pending(&coprocessor, &mut moved);
        assert!(matches!(
            deliveries[0].result,
            Err(RelayError::Registry(RegistryError::StateMismatch { .. }))
        ));
        assert!(coprocessor.pending().is_empty());
        assert!(!moved.decryption_request(id).unwrap().processed);
        assert!(deliver_pending(&coprocessor, &mut moved).is_empty());
    }

    #[tokio::test]
    async fn test_relayer_delivers_in_background() {
        let (registry, coprocessor, _, owner) = setup();
        let (tx, rx) = watch::channel(false);
        let handle = Relayer::new(coprocessor.clone(), registry.clone(), Duration::from_millis(5))
            .spawn(rx);

        let id = registry.lock().request_batch_validation(&owner, 1).unwrap();

        let mut processed = false;
        for _ in 0..200 {
            if registry.lock().decryption_request(id).unwrap().processed {
                processed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(processed);

        tx.send(true).unwrap();
        let stats = handle.await.unwrap();
        assert_eq!(stats.delivered, 1);
        assert_eq!(stats.failed, 0);
        assert!(stats.ticks >= 1);
    }

    #[tokio::test]
    async fn test_relayer_stops_when_sender_dropped() {
        let (registry, coprocessor, _, _) = setup();
        let (tx, rx) = watch::channel(false);
        let handle = Relayer::new(coprocessor, registry, Duration::from_millis(5)).spawn(rx);

        drop(tx);
        let stats = handle.await.unwrap();
        assert_eq!(stats.delivered, 0);
    }
}
