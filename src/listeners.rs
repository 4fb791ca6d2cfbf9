//! Listener contracts consumed from the alert engine.

use crate::error::ListenerError;
use crate::types::{DataSample, EventSample, TenantTriggers, TriggerOp};

/// Receives trigger mutations and placement deltas on this node.
pub trait PartitionTriggerListener: Send + Sync + 'static {
    /// A trigger mutation arrived for a trigger this node owns. Fires on
    /// exactly one node per published mutation.
    fn on_trigger_change(
        &self,
        op: TriggerOp,
        tenant_id: &str,
        trigger_id: &str,
    ) -> Result<(), ListenerError>;

    /// The assignment changed after a reconciliation. `local` is the full
    /// set this node now owns; `added` and `removed` are the deltas against
    /// the prior assignment. Fires on every node.
    fn on_partition_change(
        &self,
        local: TenantTriggers,
        added: TenantTriggers,
        removed: TenantTriggers,
    ) -> Result<(), ListenerError>;
}

/// Receives runtime samples broadcast from other nodes.
///
/// Fires on every node except the sender, once per sample.
pub trait PartitionDataListener: Send + Sync + 'static {
    /// A metric datum arrived from another node.
    fn on_new_data(&self, data: DataSample) -> Result<(), ListenerError>;

    /// An event arrived from another node.
    fn on_new_event(&self, event: EventSample) -> Result<(), ListenerError>;
}

/// Trigger listener that ignores every notification.
pub struct NoopTriggerListener;

impl PartitionTriggerListener for NoopTriggerListener {
    fn on_trigger_change(&self, _: TriggerOp, _: &str, _: &str) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_partition_change(
        &self,
        _: TenantTriggers,
        _: TenantTriggers,
        _: TenantTriggers,
    ) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Data listener that ignores every notification.
pub struct NoopDataListener;

impl PartitionDataListener for NoopDataListener {
    fn on_new_data(&self, _: DataSample) -> Result<(), ListenerError> {
        Ok(())
    }

    fn on_new_event(&self, _: EventSample) -> Result<(), ListenerError> {
        Ok(())
    }
}

/// Trigger listener that logs every notification.
pub struct LoggingTriggerListener;

impl PartitionTriggerListener for LoggingTriggerListener {
    fn on_trigger_change(
        &self,
        op: TriggerOp,
        tenant_id: &str,
        trigger_id: &str,
    ) -> Result<(), ListenerError> {
        tracing::info!(%op, tenant_id, trigger_id, "trigger changed");
        Ok(())
    }

    fn on_partition_change(
        &self,
        local: TenantTriggers,
        added: TenantTriggers,
        removed: TenantTriggers,
    ) -> Result<(), ListenerError> {
        tracing::info!(
            tenants = local.len(),
            added = added.len(),
            removed = removed.len(),
            "partition changed"
        );
        Ok(())
    }
}

/// Data listener that logs every notification.
pub struct LoggingDataListener;

impl PartitionDataListener for LoggingDataListener {
    fn on_new_data(&self, data: DataSample) -> Result<(), ListenerError> {
        tracing::info!(tenant_id = %data.tenant_id, id = %data.id, "data received");
        Ok(())
    }

    fn on_new_event(&self, event: EventSample) -> Result<(), ListenerError> {
        tracing::info!(tenant_id = %event.tenant_id, id = %event.id, "event received");
        Ok(())
    }
}
