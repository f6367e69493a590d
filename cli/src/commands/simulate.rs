//! Simulate Command - In-memory end-to-end run
//!
//! Deploys a throwaway registry, lets a set of providers submit into a few
//! batches and validates each closed batch while a relayer task delivers the
//! oracle's callbacks in the background.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use clap::Args;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::info;
use veil_fhe::{FheType, LocalCoprocessor, RequestId};
use veil_registry::{Address, AttestationRegistry, ManualClock, RegistryConfig, RegistryEvent};

use crate::relayer::{Relayer, SharedRegistry};

/// Run an in-memory end-to-end simulation
#[derive(Args)]
pub struct SimulateCommand {
    /// Number of providers
    #[arg(long, default_value = "3")]
    providers: usize,

    /// Number of batches to fill and validate
    #[arg(long, default_value = "2")]
    batches: u64,

    /// Cooldown interval in seconds
    #[arg(long, default_value = "5")]
    cooldown: u64,

    /// Relayer polling interval in milliseconds
    #[arg(long, default_value = "10")]
    poll_ms: u64,

    /// Give up waiting for a callback after this many milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,
}

impl SimulateCommand {
    pub async fn execute(self) -> anyhow::Result<()> {
        if self.providers == 0 {
            anyhow::bail!("At least one provider is required");
        }

        let start = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let clock = ManualClock::new(start);
        let owner = Address::from_label("owner");
        let coprocessor = LocalCoprocessor::with_defaults()?;
        let config = RegistryConfig::new(Address::from_label("veil-simulation"), owner)
            .with_cooldown(self.cooldown);
        let registry: SharedRegistry<ManualClock> = Arc::new(Mutex::new(AttestationRegistry::new(
            config,
            coprocessor.clone(),
            clock.clone(),
        )?));

        let providers: Vec<Address> = (1..=self.providers)
            .map(|i| Address::from_label(&format!("provider-{}", i)))
            .collect();
        {
            let mut registry = registry.lock();
            for provider in &providers {
                registry.add_provider(&owner, *provider)?;
            }
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let relayer = Relayer::new(
            coprocessor.clone(),
            registry.clone(),
            Duration::from_millis(self.poll_ms),
        )
        .spawn(shutdown_rx);

        info!(providers = providers.len(), batches = self.batches, "Simulation started");
        println!("Simulating {} provider(s) over {} batch(es)", providers.len(), self.batches);
        println!();

        for round in 0..self.batches {
            let (batch_id, request_id, expected) = {
                let mut registry = registry.lock();
                let batch_id = registry.current_batch_id();
                let mut expected = Vec::with_capacity(providers.len());
                for (i, provider) in providers.iter().enumerate() {
                    let value = (round + 1) * 100 + i as u64;
                    let handle = coprocessor.encrypt(value, FheType::Uint32)?;
                    registry.submit(provider, handle)?;
                    expected.push(value);
                }
                registry.close_current_batch(&owner)?;
                let request_id = registry.request_batch_validation(&owner, batch_id)?;
                (batch_id, request_id, expected)
            };

            wait_processed(&registry, request_id, Duration::from_millis(self.timeout_ms))
                .await
                .with_context(|| format!("Callback for {} never arrived", request_id))?;

            println!(
                "Batch {}: {} submission(s) validated by {} (plaintexts {:?})",
                batch_id,
                expected.len(),
                request_id,
                expected
            );

            clock.advance(self.cooldown);
        }

        shutdown.send(true).ok();
        let stats = relayer.await?;

        let events = registry.lock().drain_events();
        let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();
        for event in &events {
            *counts.entry(event.name()).or_default() += 1;
        }
        let completed = events
            .iter()
            .filter(|e| matches!(e, RegistryEvent::DecryptionCompleted { .. }))
            .count();

        println!();
        println!(
            "Relayer: {} tick(s), {} delivered, {} failed",
            stats.ticks, stats.delivered, stats.failed
        );
        println!("Events:");
        for (name, count) in counts {
            println!("  {:<22} {}", name, count);
        }

        if completed as u64 != self.batches {
            anyhow::bail!("Expected {} completed decryptions, saw {}", self.batches, completed);
        }
        println!();
        println!("✅ Simulation complete");
        Ok(())
    }
}

/// Poll until the registry has consumed the callback for `request_id`
async fn wait_processed(
    registry: &SharedRegistry<ManualClock>,
    request_id: RequestId,
    timeout: Duration,
) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, async {
        loop {
            let processed = registry
                .lock()
                .decryption_request(request_id)
                .map(|r| r.processed)
                .unwrap_or(false);
            if processed {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .map_err(|_| anyhow::anyhow!("Timed out after {:?}", timeout))
}
