//! Registry and coprocessor snapshot storage

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use std::sync::Arc;
use tracing::debug;
use veil_fhe::CoprocessorSnapshot;
use veil_registry::RegistryState;

use crate::{StorageError, StorageResult};

/// Latest snapshots by name
const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

const STATE_KEY: &str = "registry_state";
const ROOT_KEY: &str = "registry_root";
const COPROCESSOR_KEY: &str = "coprocessor";

/// Registry snapshot storage interface
pub struct RegistryStore {
    db: Arc<Database>,
}

impl RegistryStore {
    /// Create new registry store
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SNAPSHOTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Replace the stored registry state together with its root
    pub fn save_state(&self, state: &RegistryState) -> StorageResult<[u8; 32]> {
        let write_txn = self.db.begin_write()?;
        let root = write_state(&write_txn, state)?;
        write_txn.commit()?;
        Ok(root)
    }

    /// Load the stored registry state, verifying it against its root
    pub fn load_state(&self) -> StorageResult<Option<RegistryState>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS)?;

        let bytes = match table.get(STATE_KEY)? {
            Some(data) => data.value().to_vec(),
            None => return Ok(None),
        };
        let state = RegistryState::deserialize(&bytes)?;

        if let Some(stored) = table.get(ROOT_KEY)? {
            if stored.value() != state.state_root()?.as_slice() {
                return Err(StorageError::Corruption(
                    "registry state does not match its stored root".into(),
                ));
            }
        }

        Ok(Some(state))
    }

    /// Load the registry state or fail if none was ever saved
    pub fn require_state(&self) -> StorageResult<RegistryState> {
        self.load_state()?.ok_or(StorageError::NotInitialized)
    }

    /// Root of the stored registry state
    pub fn state_root(&self) -> StorageResult<Option<[u8; 32]>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS)?;

        let result = match table.get(ROOT_KEY)? {
            Some(data) => {
                let root: [u8; 32] = data.value().try_into().map_err(|_| {
                    StorageError::Corruption("invalid state root length".into())
                })?;
                Some(root)
            }
            None => None,
        };

        Ok(result)
    }

    /// Replace the stored coprocessor snapshot
    pub fn save_coprocessor(&self, snapshot: &CoprocessorSnapshot) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        write_coprocessor(&write_txn, snapshot)?;
        write_txn.commit()?;
        Ok(())
    }

    /// Load the stored coprocessor snapshot
    pub fn load_coprocessor(&self) -> StorageResult<Option<CoprocessorSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS)?;

        let result = match table.get(COPROCESSOR_KEY)? {
            Some(data) => Some(bincode::deserialize(data.value())?),
            None => None,
        };

        Ok(result)
    }

    /// Whether a registry has been saved
    pub fn is_initialized(&self) -> StorageResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SNAPSHOTS)?;
        let exists = table.get(STATE_KEY)?.is_some();
        Ok(exists)
    }
}

/// Stage the registry state and its root inside an open write transaction
pub(crate) fn write_state(
    write_txn: &WriteTransaction,
    state: &RegistryState,
) -> StorageResult<[u8; 32]> {
    let encoded = state.serialize()?;
    let root = state.state_root()?;

    let mut table = write_txn.open_table(SNAPSHOTS)?;
    table.insert(STATE_KEY, encoded.as_slice())?;
    table.insert(ROOT_KEY, root.as_slice())?;

    debug!(bytes = encoded.len(), root = %hex::encode(&root[..8]), "Registry state staged");
    Ok(root)
}

/// Stage the coprocessor snapshot inside an open write transaction
pub(crate) fn write_coprocessor(
    write_txn: &WriteTransaction,
    snapshot: &CoprocessorSnapshot,
) -> StorageResult<()> {
    let encoded = bincode::serialize(snapshot)?;

    let mut table = write_txn.open_table(SNAPSHOTS)?;
    table.insert(COPROCESSOR_KEY, encoded.as_slice())?;
    Ok(())
}
