//! Test harness for the partition manager.
//!
//! Recording listeners, canned definitions providers, and a builder that
//! stands up an in-process cluster of managers over
//! [`LocalCluster`](crate::local::LocalCluster). Usable from dependent
//! crates' tests as well as the integration tests in this module.


use crate::config::PartitionConfig;
use crate::definitions::DefinitionsProvider;
use crate::error::{Error, ListenerError, Result};
use crate::listeners::{PartitionDataListener, PartitionTriggerListener};
use crate::local::LocalCluster;
use crate::manager::PartitionManager;
use crate::types::{DataSample, EventSample, NodeId, TenantTriggers, TriggerKey, TriggerOp};
use parking_lot::Mutex;
use std::sync::Arc;

/// Definitions provider over a fixed trigger list.
pub struct FixedDefinitions {
    triggers: Vec<TriggerKey>,
}

impl FixedDefinitions {
    /// Provider returning the given triggers.
    pub fn new(triggers: Vec<TriggerKey>) -> Self {
        Self { triggers }
    }

    /// Provider returning no triggers.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl DefinitionsProvider for FixedDefinitions {
    fn all_triggers(&self) -> Result<Vec<TriggerKey>> {
        Ok(self.triggers.clone())
    }
}

/// Definitions provider that always fails, for cold-load fault tests.
pub struct FailingDefinitions;

impl DefinitionsProvider for FailingDefinitions {
    fn all_triggers(&self) -> Result<Vec<TriggerKey>> {
        Err(Error::DefinitionsUnavailable("definitions store offline".into()))
    }
}

/// One observed `on_partition_change` invocation.
#[derive(Debug, Clone)]
pub struct PartitionChange {
    /// Full set owned by the node at that point.
    pub local: TenantTriggers,
    /// Keys gained against the prior assignment.
    pub added: TenantTriggers,
    /// Keys lost against the prior assignment.
    pub removed: TenantTriggers,
}

/// Records every trigger listener invocation.
#[derive(Default)]
pub struct RecordingTriggerListener {
    /// Observed `on_trigger_change` calls.
    pub changes: Mutex<Vec<(TriggerOp, String, String)>>,
    /// Observed `on_partition_change` calls.
    pub partition_changes: Mutex<Vec<PartitionChange>>,
}

impl PartitionTriggerListener for RecordingTriggerListener {
    fn on_trigger_change(
        &self,
        op: TriggerOp,
        tenant_id: &str,
        trigger_id: &str,
    ) -> std::result::Result<(), ListenerError> {
        self.changes
            .lock()
            .push((op, tenant_id.to_string(), trigger_id.to_string()));
        Ok(())
    }

    fn on_partition_change(
        &self,
        local: TenantTriggers,
        added: TenantTriggers,
        removed: TenantTriggers,
    ) -> std::result::Result<(), ListenerError> {
        self.partition_changes.lock().push(PartitionChange {
            local,
            added,
            removed,
        });
        Ok(())
    }
}

/// Records every data listener invocation.
#[derive(Default)]
pub struct RecordingDataListener {
    /// Observed `on_new_data` calls.
    pub data: Mutex<Vec<DataSample>>,
    /// Observed `on_new_event` calls.
    pub events: Mutex<Vec<EventSample>>,
}

impl PartitionDataListener for RecordingDataListener {
    fn on_new_data(&self, data: DataSample) -> std::result::Result<(), ListenerError> {
        self.data.lock().push(data);
        Ok(())
    }

    fn on_new_event(&self, event: EventSample) -> std::result::Result<(), ListenerError> {
        self.events.lock().push(event);
        Ok(())
    }
}

/// A manager wired to recording listeners on one cluster node.
pub struct TestNode {
    /// The member's canonical address.
    pub address: String,
    /// The manager under test.
    pub manager: Arc<PartitionManager>,
    /// Its trigger recorder.
    pub triggers: Arc<RecordingTriggerListener>,
    /// Its data recorder.
    pub data: Arc<RecordingDataListener>,
}

impl TestNode {
    /// The node's id.
    pub fn node_id(&self) -> NodeId {
        self.manager.current_node()
    }
}

/// Stand up one manager per address on the given cluster, joining and
/// starting them in order.
pub fn cluster_of(
    cluster: &LocalCluster,
    addresses: &[&str],
    definitions: Arc<dyn DefinitionsProvider>,
) -> Vec<TestNode> {
    addresses
        .iter()
        .map(|&address| {
            let substrate = cluster.join(address);
            let manager = PartitionManager::new(
                Arc::new(substrate),
                Arc::clone(&definitions),
                PartitionConfig::default(),
            );
            let triggers = Arc::new(RecordingTriggerListener::default());
            let data = Arc::new(RecordingDataListener::default());
            manager.register_trigger_listener(triggers.clone());
            manager.register_data_listener(data.clone());
            manager.start();
            TestNode {
                address: address.to_string(),
                manager,
                triggers,
                data,
            }
        })
        .collect()
}
