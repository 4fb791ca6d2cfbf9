//! Typed access to the partition cells of the replicated store.

use crate::error::Result;
use crate::placement::BucketTable;
use crate::partition::Partition;
use crate::substrate::{Cell, Substrate};
use bytes::Bytes;
use std::sync::Arc;

/// Named key of the bucket table inside the partition cell.
pub const BUCKETS_KEY: &[u8] = b"buckets";
/// Named key of the current assignment map.
pub const CURRENT_KEY: &[u8] = b"currentPartition";
/// Named key of the previous assignment map.
pub const PREVIOUS_KEY: &[u8] = b"previousPartition";

/// Reads and batch-writes the `BUCKETS` / `CURRENT` / `PREVIOUS` cells.
///
/// Values cross the store as bincode bytes. Multi-key updates go through
/// the substrate's batched write, so readers observe either the prior
/// snapshot or the new one, never a mix.
#[derive(Clone)]
pub struct PartitionState {
    substrate: Arc<dyn Substrate>,
}

impl PartitionState {
    /// Wrap a substrate handle.
    pub fn new(substrate: Arc<dyn Substrate>) -> Self {
        Self { substrate }
    }

    /// The stored bucket table, absent before the first reconciliation.
    pub fn buckets(&self) -> Result<Option<BucketTable>> {
        self.read(BUCKETS_KEY)
    }

    /// The stored current assignment map.
    pub fn current(&self) -> Result<Option<Partition>> {
        self.read(CURRENT_KEY)
    }

    /// The stored previous assignment map.
    pub fn previous(&self) -> Result<Option<Partition>> {
        self.read(PREVIOUS_KEY)
    }

    /// Reconciliation write: bucket table and both assignment maps as one
    /// snapshot-visible batch. `previous` is omitted on first
    /// initialisation.
    pub fn write_reconciled(
        &self,
        buckets: &BucketTable,
        previous: Option<&Partition>,
        current: &Partition,
    ) -> Result<()> {
        let mut writes = Vec::with_capacity(3);
        writes.push((Bytes::from_static(BUCKETS_KEY), encode(buckets)?));
        if let Some(previous) = previous {
            writes.push((Bytes::from_static(PREVIOUS_KEY), encode(previous)?));
        }
        writes.push((Bytes::from_static(CURRENT_KEY), encode(current)?));
        self.substrate.write_batch(Cell::Partition, writes)
    }

    /// Owner-side write for a single trigger add or remove.
    pub fn write_owner_update(&self, previous: &Partition, current: &Partition) -> Result<()> {
        self.substrate.write_batch(
            Cell::Partition,
            vec![
                (Bytes::from_static(PREVIOUS_KEY), encode(previous)?),
                (Bytes::from_static(CURRENT_KEY), encode(current)?),
            ],
        )
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.substrate.get(Cell::Partition, key)? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Bytes> {
    Ok(Bytes::from(bincode::serialize(value)?))
}
