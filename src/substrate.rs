//! The cluster substrate contract.
//!
//! The substrate supplies everything the partition manager needs from the
//! cluster: the membership view, coordinator election, and a replicated
//! keyed store with per-entry created notifications and batched
//! snapshot-visible writes. Its internals are opaque;
//! [`LocalCluster`](crate::local::LocalCluster) is the in-process reference
//! implementation.

use crate::error::Result;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;

/// The replicated cells used by the partition manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Named partition-state keys: bucket table, current and previous
    /// assignment maps.
    Partition,
    /// Ephemeral trigger envelopes keyed by entry hash.
    Triggers,
    /// Ephemeral sample envelopes keyed by entry hash.
    Data,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Partition => write!(f, "partition"),
            Cell::Triggers => write!(f, "triggers"),
            Cell::Data => write!(f, "data"),
        }
    }
}

/// Callbacks delivered from the substrate's dispatcher threads.
///
/// Implementations must tolerate concurrent invocation for different cells;
/// the substrate runs at most one view-changed callback at a time.
pub trait SubstrateListener: Send + Sync + 'static {
    /// The membership view changed.
    fn on_view_changed(&self);

    /// An entry was created in `cell`. The notification carries the
    /// inserted bytes, as replicated stores deliver the write together with
    /// the event; the entry itself may already have been consumed by
    /// another node.
    fn on_entry_created(&self, cell: Cell, key: &[u8], value: &[u8]);
}

/// Membership, coordinator election, and the replicated keyed store.
pub trait Substrate: Send + Sync + 'static {
    /// Whether a cluster transport is active. Without one the partition
    /// manager stays disabled.
    fn has_transport(&self) -> bool;

    /// Canonical address of the local member, the input for its
    /// [`NodeId`](crate::types::NodeId).
    fn local_address(&self) -> String;

    /// Current members in the substrate's canonical order.
    fn members(&self) -> Result<Vec<String>>;

    /// Whether the local member coordinates the current view.
    fn is_coordinator(&self) -> bool;

    /// Subscribe to view-changed and entry-created callbacks.
    fn subscribe(&self, listener: Arc<dyn SubstrateListener>);

    /// Read an entry.
    fn get(&self, cell: Cell, key: &[u8]) -> Result<Option<Bytes>>;

    /// Insert an entry. Created notifications fire on every node, once per
    /// key; re-inserting an existing key is silent.
    fn insert(&self, cell: Cell, key: &[u8], value: Bytes) -> Result<()>;

    /// Remove an entry. Removing an absent key is not an error.
    fn remove(&self, cell: Cell, key: &[u8]) -> Result<()>;

    /// Apply all writes as one unit with snapshot visibility: a reader
    /// sees either none or all of them. No created notifications fire for
    /// batched keys.
    fn write_batch(&self, cell: Cell, writes: Vec<(Bytes, Bytes)>) -> Result<()>;
}
