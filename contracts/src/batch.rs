//! Batch lifecycle state machine
//!
//! Batches are numbered from 1 and only ever move Active -> Closed. Closing
//! the current batch and opening its successor happen in one step, so
//! outside observers always see exactly one active batch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use veil_fhe::CiphertextHandle;

use crate::access::AccessRegistry;
use crate::address::Address;
use crate::errors::{RegistryError, RegistryResult};

/// Batch identifier, assigned in strictly increasing order from 1
pub type BatchId = u64;

/// Id of the batch opened at deployment; 0 is never a valid batch
pub const FIRST_BATCH_ID: BatchId = 1;

/// One batch record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub active: bool,
    pub created_at: u64,
    pub closed_at: Option<u64>,
}

impl Batch {
    fn open(id: BatchId, now: u64) -> Self {
        Self {
            id,
            active: true,
            created_at: now,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.active && self.closed_at.is_some()
    }
}

/// An accepted submission; immutable once recorded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub provider: Address,
    pub batch_id: BatchId,
    pub handle: CiphertextHandle,
    pub timestamp: u64,
}

/// Result of closing the current batch
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchTransition {
    pub closed: Batch,
    pub opened: Batch,
}

/// Batch table, per-batch submission lists and the current-batch pointer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLedger {
    batches: BTreeMap<BatchId, Batch>,
    submissions: BTreeMap<BatchId, Vec<SubmissionRecord>>,
    current_batch_id: BatchId,
}

impl BatchLedger {
    /// Start with the first batch active
    pub fn new(now: u64) -> Self {
        let mut batches = BTreeMap::new();
        batches.insert(FIRST_BATCH_ID, Batch::open(FIRST_BATCH_ID, now));
        Self {
            batches,
            submissions: BTreeMap::new(),
            current_batch_id: FIRST_BATCH_ID,
        }
    }

    pub fn current_batch_id(&self) -> BatchId {
        self.current_batch_id
    }

    pub fn current_batch(&self) -> Option<&Batch> {
        self.batches.get(&self.current_batch_id)
    }

    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.get(&id)
    }

    /// All batches in id order
    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.values()
    }

    pub fn active_count(&self) -> usize {
        self.batches.values().filter(|b| b.active).count()
    }

    /// Submissions for a batch in insertion order
    pub fn submissions(&self, id: BatchId) -> &[SubmissionRecord] {
        self.submissions.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ciphertext handles for a batch in insertion order
    pub fn handles(&self, id: BatchId) -> Vec<CiphertextHandle> {
        self.submissions(id).iter().map(|s| s.handle).collect()
    }

    /// The current batch, provided it is still active
    pub fn ensure_current_active(&self) -> RegistryResult<&Batch> {
        let batch = self.current_batch().ok_or(RegistryError::InvalidBatch {
            batch_id: self.current_batch_id,
        })?;
        if !batch.active {
            return Err(RegistryError::BatchNotActive { batch_id: batch.id });
        }
        Ok(batch)
    }

    /// A batch that exists and has been closed: `0 < id < current` and `closed_at` set
    pub fn ensure_closed(&self, id: BatchId) -> RegistryResult<&Batch> {
        if id == 0 || id >= self.current_batch_id {
            return Err(RegistryError::InvalidBatch { batch_id: id });
        }
        match self.batches.get(&id) {
            Some(batch) if batch.closed_at.is_some() => Ok(batch),
            _ => Err(RegistryError::InvalidBatch { batch_id: id }),
        }
    }

    /// Append a submission to the batch it names
    ///
    /// Closed batches never accept further writes.
    pub fn append(&mut self, record: SubmissionRecord) -> RegistryResult<()> {
        let batch = self.batches.get(&record.batch_id).ok_or(RegistryError::InvalidBatch {
            batch_id: record.batch_id,
        })?;
        if !batch.active {
            return Err(RegistryError::BatchNotActive {
                batch_id: record.batch_id,
            });
        }
        self.submissions.entry(record.batch_id).or_default().push(record);
        Ok(())
    }

    /// Close the current batch and open its successor in one step
    pub fn close_current_batch(
        &mut self,
        access: &AccessRegistry,
        caller: &Address,
        now: u64,
    ) -> RegistryResult<BatchTransition> {
        access.ensure_owner(caller)?;
        let current = *self.ensure_current_active()?;

        let closed = Batch {
            active: false,
            closed_at: Some(now),
            ..current
        };
        let next_id = current.id + 1;
        let opened = Batch::open(next_id, now);

        self.batches.insert(closed.id, closed);
        self.batches.insert(opened.id, opened);
        self.current_batch_id = next_id;

        Ok(BatchTransition { closed, opened })
    }

    #[cfg(test)]
    pub(crate) fn append_unchecked(&mut self, record: SubmissionRecord) {
        self.submissions.entry(record.batch_id).or_default().push(record);
    }
}
