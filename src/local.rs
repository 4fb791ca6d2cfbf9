//! In-process reference substrate.
//!
//! [`LocalCluster`] keeps the replicated cells and the membership view in
//! process-shared memory and fans every created entry out to all subscribed
//! nodes synchronously, coordinator first. It backs embedded
//! single-process deployments and the integration tests; a production
//! deployment plugs a real replicated store behind the same
//! [`Substrate`] contract.

use crate::error::{Error, Result};
use crate::substrate::{Cell, Substrate, SubstrateListener};
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Default)]
struct ClusterShared {
    /// Snapshot-visible named keys; batched writes swap entries under one
    /// lock so readers never see a mixed state.
    partition: RwLock<HashMap<Bytes, Bytes>>,

    /// Ephemeral bus entries keyed by envelope hash.
    triggers: DashMap<Bytes, Bytes>,
    data: DashMap<Bytes, Bytes>,

    /// Members in join order. The oldest member coordinates.
    members: RwLock<Vec<String>>,

    /// Subscribed listeners tagged with their member address.
    subscribers: RwLock<Vec<(String, Arc<dyn SubstrateListener>)>>,
}

impl ClusterShared {
    /// Listeners in member order, so the coordinator handles every signal
    /// before any other node.
    fn ordered_listeners(&self) -> Vec<Arc<dyn SubstrateListener>> {
        let members = self.members.read().clone();
        let subscribers = self.subscribers.read();
        let mut ordered = Vec::with_capacity(subscribers.len());
        for member in &members {
            for (address, listener) in subscribers.iter() {
                if address == member {
                    ordered.push(Arc::clone(listener));
                }
            }
        }
        ordered
    }
}

/// An in-process cluster of partition manager nodes.
///
/// Cloning shares the underlying cells and membership.
#[derive(Clone)]
pub struct LocalCluster {
    shared: Arc<ClusterShared>,
    transport: bool,
}

impl LocalCluster {
    /// Create a clustered in-process substrate.
    pub fn new() -> Self {
        Self {
            shared: Arc::default(),
            transport: true,
        }
    }

    /// Create a substrate with no transport; managers on it stay disabled.
    pub fn without_transport() -> Self {
        Self {
            shared: Arc::default(),
            transport: false,
        }
    }

    /// Add a member and notify every subscribed node of the new view.
    ///
    /// Returns the member's handle; a manager built on it participates in
    /// the cluster once it subscribes.
    pub fn join(&self, address: impl Into<String>) -> LocalSubstrate {
        let address = address.into();
        {
            let mut members = self.shared.members.write();
            if !members.contains(&address) {
                members.push(address.clone());
            }
        }
        debug!(%address, "member joined local cluster");
        self.fire_view_changed();
        LocalSubstrate {
            shared: Arc::clone(&self.shared),
            address,
            transport: self.transport,
        }
    }

    /// Remove a member, drop its subscriptions, and notify the remaining
    /// nodes.
    pub fn leave(&self, address: &str) {
        self.shared.members.write().retain(|member| member != address);
        self.shared
            .subscribers
            .write()
            .retain(|(subscriber, _)| subscriber != address);
        debug!(%address, "member left local cluster");
        self.fire_view_changed();
    }

    /// Current members in join order.
    pub fn members(&self) -> Vec<String> {
        self.shared.members.read().clone()
    }

    /// Number of entries parked in a cell. For bus cells this is the
    /// unconsumed backlog.
    pub fn pending_entries(&self, cell: Cell) -> usize {
        match cell {
            Cell::Partition => self.shared.partition.read().len(),
            Cell::Triggers => self.shared.triggers.len(),
            Cell::Data => self.shared.data.len(),
        }
    }

    fn fire_view_changed(&self) {
        // Collected first so no lock is held while handlers run.
        for listener in self.shared.ordered_listeners() {
            listener.on_view_changed();
        }
    }
}

impl Default for LocalCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// One member's handle to a [`LocalCluster`].
#[derive(Clone)]
pub struct LocalSubstrate {
    shared: Arc<ClusterShared>,
    address: String,
    transport: bool,
}

impl Substrate for LocalSubstrate {
    fn has_transport(&self) -> bool {
        self.transport
    }

    fn local_address(&self) -> String {
        self.address.clone()
    }

    fn members(&self) -> Result<Vec<String>> {
        Ok(self.shared.members.read().clone())
    }

    fn is_coordinator(&self) -> bool {
        self.shared.members.read().first() == Some(&self.address)
    }

    fn subscribe(&self, listener: Arc<dyn SubstrateListener>) {
        self.shared
            .subscribers
            .write()
            .push((self.address.clone(), listener));
    }

    fn get(&self, cell: Cell, key: &[u8]) -> Result<Option<Bytes>> {
        Ok(match cell {
            Cell::Partition => self.shared.partition.read().get(key).cloned(),
            Cell::Triggers => self.shared.triggers.get(key).map(|entry| entry.value().clone()),
            Cell::Data => self.shared.data.get(key).map(|entry| entry.value().clone()),
        })
    }

    fn insert(&self, cell: Cell, key: &[u8], value: Bytes) -> Result<()> {
        let owned_key = Bytes::copy_from_slice(key);
        let created = match cell {
            Cell::Partition => self
                .shared
                .partition
                .write()
                .insert(owned_key.clone(), value.clone())
                .is_none(),
            Cell::Triggers => self
                .shared
                .triggers
                .insert(owned_key.clone(), value.clone())
                .is_none(),
            Cell::Data => self
                .shared
                .data
                .insert(owned_key.clone(), value.clone())
                .is_none(),
        };
        if created {
            for listener in self.shared.ordered_listeners() {
                listener.on_entry_created(cell, &owned_key, &value);
            }
        }
        Ok(())
    }

    fn remove(&self, cell: Cell, key: &[u8]) -> Result<()> {
        match cell {
            Cell::Partition => {
                self.shared.partition.write().remove(key);
            }
            Cell::Triggers => {
                self.shared.triggers.remove(key);
            }
            Cell::Data => {
                self.shared.data.remove(key);
            }
        }
        Ok(())
    }

    fn write_batch(&self, cell: Cell, writes: Vec<(Bytes, Bytes)>) -> Result<()> {
        match cell {
            Cell::Partition => {
                let mut partition = self.shared.partition.write();
                for (key, value) in writes {
                    partition.insert(key, value);
                }
                Ok(())
            }
            // Bus entries are independent; batches only make sense for the
            // snapshot-visible partition cell.
            Cell::Triggers | Cell::Data => Err(Error::InvalidArgument(format!(
                "cell {cell} does not support batched writes"
            ))),
        }
    }
}
