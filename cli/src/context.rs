//! Persistent deployment context shared by the registry commands
//!
//! A `Deployment` is the registry, its local coprocessor and the storage they
//! are persisted in, rebuilt for one command and committed back afterwards.

use std::path::PathBuf;

use anyhow::Context;
use tracing::debug;
use veil_fhe::LocalCoprocessor;
use veil_registry::{Address, AttestationRegistry, Clock, SystemClock};
use veil_storage::Storage;

use crate::config::{default_config_path, default_data_dir, VeilConfig};

/// Resolve the data directory and config file for a command
pub fn resolve_paths(config: Option<PathBuf>, data_dir: Option<PathBuf>) -> (PathBuf, PathBuf) {
    let data_dir = data_dir.unwrap_or_else(default_data_dir);
    let config_path = config.unwrap_or_else(|| default_config_path(&data_dir));
    (data_dir, config_path)
}

/// Parse a principal given on the command line
///
/// `0x`-prefixed values are raw addresses; anything else is a label that
/// derives a deterministic address (`owner`, `provider-1`).
pub fn parse_principal(input: &str) -> anyhow::Result<Address> {
    if input.starts_with("0x") {
        input
            .parse()
            .with_context(|| format!("Invalid address '{}'", input))
    } else {
        Ok(Address::from_label(input))
    }
}

pub struct Deployment {
    pub config: VeilConfig,
    pub storage: Storage,
    pub registry: AttestationRegistry<LocalCoprocessor, SystemClock>,
    pub coprocessor: LocalCoprocessor,
}

impl Deployment {
    /// Open an initialized deployment
    pub fn open(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let (data_dir, config_path) = resolve_paths(config_path, data_dir);
        let config = VeilConfig::load(&config_path).with_context(|| {
            format!(
                "No deployment at {}. Run `veil init` first.",
                data_dir.display()
            )
        })?;

        let storage = Storage::open(data_dir.join(&config.storage.db_file))?;
        let state = storage.registry.require_state()?;
        let snapshot = storage
            .registry
            .load_coprocessor()?
            .context("Coprocessor snapshot missing from storage")?;
        let coprocessor = LocalCoprocessor::restore(snapshot)?;

        debug!(path = %storage.config().path.display(), "Deployment opened");
        let registry = AttestationRegistry::from_snapshot(state, coprocessor.clone(), SystemClock);

        Ok(Self {
            config,
            storage,
            registry,
            coprocessor,
        })
    }

    /// The caller for a mutating command, defaulting to the configured owner
    pub fn caller(&self, arg: Option<&str>) -> anyhow::Result<Address> {
        match arg {
            Some(input) => parse_principal(input),
            None => Ok(self.config.owner()?),
        }
    }

    /// Persist registry state, coprocessor state and new events atomically
    pub fn commit(&mut self) -> anyhow::Result<usize> {
        let events = self.registry.drain_events();
        let receipt = self.storage.commit(
            self.registry.state(),
            &self.coprocessor.snapshot(),
            &events,
            self.registry.clock().now(),
        )?;
        Ok(receipt.event_seqs.len())
    }
}

/// Open a deployment, apply one mutation and commit it
///
/// Nothing is persisted when `apply` fails, so a rejected registry call
/// leaves storage untouched.
pub fn transact<T>(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    apply: impl FnOnce(&mut Deployment) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let mut deployment = Deployment::open(config_path, data_dir)?;
    let output = apply(&mut deployment)?;
    let events = deployment.commit()?;
    debug!(events, "Deployment committed");
    Ok(output)
}
