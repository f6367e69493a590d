//! Append-only registry event log

use redb::{Database, ReadableTable, TableDefinition, WriteTransaction};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use veil_registry::RegistryEvent;

use crate::StorageResult;

/// Events by sequence number, starting at 1
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");

/// Event with its position in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub seq: u64,
    /// Registry clock reading when the event was persisted
    pub timestamp: u64,
    pub event: RegistryEvent,
}

/// Event log storage interface
pub struct EventStore {
    db: Arc<Database>,
}

impl EventStore {
    /// Create new event store
    pub fn new(db: Arc<Database>) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    /// Append events in order; returns their sequence numbers
    pub fn append(&self, events: &[RegistryEvent], timestamp: u64) -> StorageResult<Vec<u64>> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        let write_txn = self.db.begin_write()?;
        let seqs = write_events(&write_txn, events, timestamp)?;
        write_txn.commit()?;

        Ok(seqs)
    }

    /// Up to `limit` events starting at sequence number `from`
    pub fn range(&self, from: u64, limit: usize) -> StorageResult<Vec<StoredEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;

        let mut events = Vec::new();
        for item in table.range(from..)?.take(limit) {
            let (_, data) = item?;
            events.push(bincode::deserialize(data.value())?);
        }

        Ok(events)
    }

    /// The most recent `n` events, oldest first
    pub fn latest(&self, n: usize) -> StorageResult<Vec<StoredEvent>> {
        let count = self.count()?;
        let from = count.saturating_sub(n as u64) + 1;
        self.range(from, n)
    }

    /// Number of stored events
    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(EVENTS)?;
        let len = table.len()?;
        Ok(len)
    }
}

/// Stage events at the end of the log inside an open write transaction
pub(crate) fn write_events(
    write_txn: &WriteTransaction,
    events: &[RegistryEvent],
    timestamp: u64,
) -> StorageResult<Vec<u64>> {
    let mut seqs = Vec::with_capacity(events.len());
    let mut table = write_txn.open_table(EVENTS)?;
    let mut next = match table.last()? {
        Some((key, _)) => key.value() + 1,
        None => 1,
    };

    for event in events {
        let stored = StoredEvent {
            seq: next,
            timestamp,
            event: event.clone(),
        };
        let encoded = bincode::serialize(&stored)?;
        table.insert(next, encoded.as_slice())?;
        seqs.push(next);
        next += 1;
    }

    Ok(seqs)
}
