//! The partition manager.
//!
//! Ties the placer, the bucket table and the partition cells together:
//! reconciles the shared partition map on topology changes (coordinator
//! only), routes trigger mutations to their owner node, and broadcasts
//! runtime samples to every other node.

use crate::bus::{entry_key, NotifySample, NotifyTrigger, SamplePayload};
use crate::config::PartitionConfig;
use crate::definitions::{load_all_bounded, DefinitionsProvider};
use crate::error::{Error, Result};
use crate::listeners::{PartitionDataListener, PartitionTriggerListener};
use crate::partition::{Partition, PartitionState};
use crate::placement::{compute_partition, place_of, BucketTable};
use crate::substrate::{Cell, Substrate, SubstrateListener};
use crate::types::{node_id_for, DataSample, EventSample, NodeId, TriggerKey, TriggerOp};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Decides which node owns each trigger and propagates trigger and sample
/// events between nodes.
///
/// Constructed against a [`Substrate`] and a [`DefinitionsProvider`] and
/// wired into the substrate with [`start`](Self::start). When the substrate
/// reports no cluster transport the manager is disabled: every method
/// returns immediately and no listener ever fires.
///
/// All methods are safe to call concurrently. Publish methods are
/// fire-and-forget; failures are logged and swallowed, and a lost bus entry
/// is repaired by the engine's periodic reconciliation.
pub struct PartitionManager {
    substrate: Arc<dyn Substrate>,
    definitions: Arc<dyn DefinitionsProvider>,
    config: PartitionConfig,
    state: PartitionState,

    /// False outside a clustered deployment. Immutable after construction.
    distributed: bool,

    /// This node, derived from the substrate's canonical local address.
    current_node: NodeId,

    trigger_listener: RwLock<Option<Arc<dyn PartitionTriggerListener>>>,
    data_listener: RwLock<Option<Arc<dyn PartitionDataListener>>>,

    /// Serialises owner-side read-modify-write of the partition cell, so
    /// concurrently delivered entries for distinct keys do not lose
    /// updates.
    apply_lock: Mutex<()>,
}

impl PartitionManager {
    /// Create a manager bound to a substrate and a definitions provider.
    pub fn new(
        substrate: Arc<dyn Substrate>,
        definitions: Arc<dyn DefinitionsProvider>,
        config: PartitionConfig,
    ) -> Arc<Self> {
        let distributed = substrate.has_transport();
        let current_node = node_id_for(&substrate.local_address());
        let state = PartitionState::new(Arc::clone(&substrate));
        Arc::new(Self {
            substrate,
            definitions,
            config,
            state,
            distributed,
            current_node,
            trigger_listener: RwLock::new(None),
            data_listener: RwLock::new(None),
            apply_lock: Mutex::new(()),
        })
    }

    /// Whether the deployment is clustered.
    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// This node's id.
    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    /// Register the engine's trigger listener.
    ///
    /// Registered once at startup; replacement is not supported and later
    /// calls are ignored.
    pub fn register_trigger_listener(&self, listener: Arc<dyn PartitionTriggerListener>) {
        let mut slot = self.trigger_listener.write();
        if slot.is_some() {
            warn!("trigger listener already registered, ignoring replacement");
            return;
        }
        *slot = Some(listener);
    }

    /// Register the engine's data listener. Same once-only rule as the
    /// trigger listener.
    pub fn register_data_listener(&self, listener: Arc<dyn PartitionDataListener>) {
        let mut slot = self.data_listener.write();
        if slot.is_some() {
            warn!("data listener already registered, ignoring replacement");
            return;
        }
        *slot = Some(listener);
    }

    /// Subscribe to the substrate and compute the initial partition.
    pub fn start(self: &Arc<Self>) {
        if !self.distributed {
            info!("no cluster transport, partition manager disabled");
            return;
        }
        info!(node = self.current_node, "partition manager enabled");
        self.substrate
            .subscribe(Arc::clone(self) as Arc<dyn SubstrateListener>);
        self.handle_view_change();
    }

    /// Read-only view of the current assignment map.
    pub fn current_partition(&self) -> Result<Option<Partition>> {
        self.state.current()
    }

    /// Read-only view of the previous assignment map.
    pub fn previous_partition(&self) -> Result<Option<Partition>> {
        self.state.previous()
    }

    /// Read-only view of the bucket table.
    pub fn bucket_table(&self) -> Result<Option<BucketTable>> {
        self.state.buckets()
    }

    // ==================== Publishing ====================

    /// Route one trigger mutation to its owner node.
    pub fn notify_trigger(&self, op: TriggerOp, tenant_id: &str, trigger_id: &str) {
        if !self.distributed {
            return;
        }
        if let Err(e) = self.publish_trigger(op, tenant_id, trigger_id) {
            warn!(%op, tenant_id, trigger_id, error = %e, "dropping trigger notification");
        }
    }

    /// Broadcast a metric datum to every other node.
    pub fn notify_data(&self, data: DataSample) {
        self.notify_sample(SamplePayload::Data(data));
    }

    /// Broadcast an event to every other node.
    pub fn notify_event(&self, event: EventSample) {
        self.notify_sample(SamplePayload::Event(event));
    }

    fn publish_trigger(&self, op: TriggerOp, tenant_id: &str, trigger_id: &str) -> Result<()> {
        let key = TriggerKey::new(tenant_id, trigger_id)?;
        let buckets = self
            .state
            .buckets()?
            .ok_or_else(|| Error::SubstrateUnavailable("bucket table not initialised".into()))?;
        let to_node = place_of(&key, &buckets)?;
        let envelope = NotifyTrigger::new(self.current_node, to_node, op, tenant_id, trigger_id);
        let encoded = envelope.encode()?;
        let bus_key = entry_key(&encoded).to_be_bytes();
        debug!(%envelope, "publishing trigger notification");
        self.substrate.insert(Cell::Triggers, &bus_key, encoded)
    }

    fn notify_sample(&self, payload: SamplePayload) {
        if !self.distributed {
            return;
        }
        let envelope = NotifySample::new(self.current_node, payload);
        let published = envelope.encode().and_then(|encoded| {
            let bus_key = entry_key(&encoded).to_be_bytes();
            self.substrate.insert(Cell::Data, &bus_key, encoded)
        });
        if let Err(e) = published {
            warn!(error = %e, "dropping sample notification");
        }
    }

    // ==================== Reconciliation ====================

    fn handle_view_change(&self) {
        self.reconcile();
        self.publish_partition_deltas();
    }

    fn reconcile(&self) {
        if !self.substrate.is_coordinator() {
            debug!(node = self.current_node, "not coordinator, skipping reconciliation");
            return;
        }
        if let Err(e) = self.reconcile_as_coordinator() {
            warn!(error = %e, "reconciliation aborted, next view change retries");
        }
    }

    fn reconcile_as_coordinator(&self) -> Result<()> {
        let members: Vec<NodeId> = self
            .substrate
            .members()?
            .iter()
            .map(|address| node_id_for(address))
            .collect();
        let old_buckets = self.state.buckets()?;
        let old_current = self.state.current()?;

        let new_buckets = BucketTable::rebuild(old_buckets.as_ref(), &members)?;
        debug!(members = members.len(), old = ?old_buckets, new = ?new_buckets, "rebuilt bucket table");

        let entries: Vec<TriggerKey> = match &old_current {
            Some(current) => current.keys().cloned().collect(),
            None => match load_all_bounded(&self.definitions, self.config.definitions_timeout) {
                Ok(entries) => entries,
                Err(e) => {
                    error!(error = %e, "cold load failed, starting with an empty partition");
                    Vec::new()
                }
            },
        };

        let new_current = compute_partition(entries, &new_buckets)?;
        info!(
            triggers = new_current.len(),
            buckets = new_buckets.len(),
            "reconciled partition"
        );
        self.state
            .write_reconciled(&new_buckets, old_current.as_ref(), &new_current)
    }

    // ==================== Delta publication ====================

    fn publish_partition_deltas(&self) {
        // Clone the handle out so no lock is held while engine code runs.
        let listener = self.trigger_listener.read().clone();
        let listener = match listener {
            Some(listener) => listener,
            None => return,
        };
        let current = match self.state.current() {
            Ok(Some(current)) => current,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "cannot read partition for delta publication");
                return;
            }
        };
        let previous = match self.state.previous() {
            Ok(previous) => previous.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "cannot read previous partition for delta publication");
                return;
            }
        };

        let local = current.tenant_view(self.current_node);
        let (added, removed) = Partition::diff(&previous, &current, self.current_node);
        debug!(
            node = self.current_node,
            local = local.len(),
            added = added.len(),
            removed = removed.len(),
            "publishing partition deltas"
        );
        if let Err(e) = listener.on_partition_change(local, added, removed) {
            warn!(error = %e, "partition change listener failed");
        }
    }

    // ==================== Bus entry handling ====================

    fn handle_trigger_entry(&self, key: &[u8], value: &[u8]) {
        let envelope = match NotifyTrigger::decode(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable trigger envelope");
                return;
            }
        };
        if envelope.to_node != self.current_node {
            debug!(%envelope, node = self.current_node, "trigger addressed to another node");
            return;
        }
        // Consume the entry first; the bus cell is ephemeral space.
        if let Err(e) = self.substrate.remove(Cell::Triggers, key) {
            warn!(error = %e, "could not reclaim trigger bus entry");
        }
        if let Err(e) = self.apply_owned_trigger(&envelope) {
            warn!(%envelope, error = %e, "could not apply trigger mutation");
            return;
        }
        self.invoke_trigger_listener(&envelope);
    }

    fn apply_owned_trigger(&self, envelope: &NotifyTrigger) -> Result<()> {
        let trigger = TriggerKey::new(envelope.tenant_id.clone(), envelope.trigger_id.clone())?;
        let _guard = self.apply_lock.lock();
        let current = self.state.current()?.unwrap_or_default();
        let exists = current.contains(&trigger);
        match envelope.op {
            TriggerOp::Add if !exists => {
                let mut next = current.clone();
                next.assign(trigger, self.current_node);
                debug!(%envelope, triggers = next.len(), "added trigger to partition");
                self.state.write_owner_update(&current, &next)?;
            }
            TriggerOp::Remove if exists => {
                let mut next = current.clone();
                next.unassign(&trigger);
                debug!(%envelope, triggers = next.len(), "removed trigger from partition");
                self.state.write_owner_update(&current, &next)?;
            }
            // Updates change the definition, not the placement.
            _ => {}
        }
        Ok(())
    }

    fn invoke_trigger_listener(&self, envelope: &NotifyTrigger) {
        let listener = self.trigger_listener.read().clone();
        let listener = match listener {
            Some(listener) => listener,
            None => return,
        };
        if let Err(e) =
            listener.on_trigger_change(envelope.op, &envelope.tenant_id, &envelope.trigger_id)
        {
            warn!(%envelope, error = %e, "trigger change listener failed");
        }
    }

    fn handle_data_entry(&self, key: &[u8], value: &[u8]) {
        let envelope = match NotifySample::decode(value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "ignoring undecodable sample envelope");
                return;
            }
        };
        if envelope.from_node == self.current_node {
            // The sender already evaluated locally; it only reclaims its
            // own broadcast.
            if let Err(e) = self.substrate.remove(Cell::Data, key) {
                warn!(error = %e, "could not reclaim sample bus entry");
            }
            return;
        }
        let listener = self.data_listener.read().clone();
        let listener = match listener {
            Some(listener) => listener,
            None => return,
        };
        let delivered = match envelope.payload {
            SamplePayload::Data(data) => listener.on_new_data(data),
            SamplePayload::Event(event) => listener.on_new_event(event),
        };
        if let Err(e) = delivered {
            warn!(error = %e, "data listener failed");
        }
    }
}

impl SubstrateListener for PartitionManager {
    fn on_view_changed(&self) {
        debug!(node = self.current_node, "view changed");
        self.handle_view_change();
    }

    fn on_entry_created(&self, cell: Cell, key: &[u8], value: &[u8]) {
        match cell {
            Cell::Triggers => self.handle_trigger_entry(key, value),
            Cell::Data => self.handle_data_entry(key, value),
            // Partition cell writes are batched and carry no events worth
            // reacting to here.
            Cell::Partition => {}
        }
    }
}
