//! VEIL Storage Layer
//!
//! Persistent storage for a registry deployment.
//!
//! # Architecture
//!
//! The storage layer uses redb (an embedded database) for:
//! - The latest registry state, with its state root
//! - The local coprocessor snapshot (handles, keys, pending queue)
//! - An append-only event log keyed by sequence number

pub mod events;
pub mod registry;
mod error;

pub use error::{StorageError, StorageResult};
pub use events::{EventStore, StoredEvent};
pub use registry::RegistryStore;

use redb::Database;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use veil_fhe::CoprocessorSnapshot;
use veil_registry::{RegistryEvent, RegistryState};

/// Default database file name inside the data directory
pub const DEFAULT_DB_FILE: &str = "veil.redb";

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Database path
    pub path: std::path::PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: std::path::PathBuf::from("./veil_data").join(DEFAULT_DB_FILE),
        }
    }
}

/// What a [`Storage::commit`] wrote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub state_root: [u8; 32],
    pub event_seqs: Vec<u64>,
}

/// Main storage interface
pub struct Storage {
    config: StorageConfig,
    db: Arc<Database>,
    pub registry: RegistryStore,
    pub events: EventStore,
}

impl Storage {
    /// Open or create storage at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let config = StorageConfig {
            path: path.as_ref().to_path_buf(),
        };
        Self::with_config(config)
    }

    /// Open storage with custom configuration
    pub fn with_config(config: StorageConfig) -> StorageResult<Self> {
        // Ensure directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Arc::new(Database::create(&config.path)?);

        let registry = RegistryStore::new(db.clone())?;
        let events = EventStore::new(db.clone())?;

        Ok(Self {
            config,
            db,
            registry,
            events,
        })
    }

    /// Persist the registry state, the coprocessor snapshot and new events
    /// in a single write transaction; either all of them land or none do
    pub fn commit(
        &self,
        state: &RegistryState,
        coprocessor: &CoprocessorSnapshot,
        events: &[RegistryEvent],
        timestamp: u64,
    ) -> StorageResult<CommitReceipt> {
        let write_txn = self.db.begin_write()?;
        let state_root = crate::registry::write_state(&write_txn, state)?;
        crate::registry::write_coprocessor(&write_txn, coprocessor)?;
        let event_seqs = crate::events::write_events(&write_txn, events, timestamp)?;
        write_txn.commit()?;

        debug!(
            root = %hex::encode(&state_root[..8]),
            events = event_seqs.len(),
            "Deployment committed"
        );
        Ok(CommitReceipt {
            state_root,
            event_seqs,
        })
    }

    /// Get storage configuration
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    /// Get database statistics
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            path: self.config.path.clone(),
            initialized: self.registry.is_initialized().unwrap_or(false),
            state_root: self.registry.state_root().ok().flatten(),
            event_count: self.events.count().unwrap_or(0),
        }
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    pub path: std::path::PathBuf,
    pub initialized: bool,
    pub state_root: Option<[u8; 32]>,
    pub event_count: u64,
}
