//! Bus envelopes broadcast through the replicated store.
//!
//! Trigger mutations and runtime samples travel between nodes as ephemeral
//! entries in the `triggers` and `data` cells. An entry is keyed by the
//! hash of its encoded bytes, so re-publishing an identical operation
//! collides idempotently, and is removed once consumed.

use crate::error::Result;
use crate::types::{DataSample, EventSample, NodeId, TriggerOp};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash64;

/// Envelope routing one trigger mutation to its owner node.
///
/// Created by the publisher, consumed (removed) by `to_node` after
/// delivery; every other node ignores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyTrigger {
    /// Node that published the mutation.
    pub from_node: NodeId,
    /// Node that owns the trigger and must apply the mutation.
    pub to_node: NodeId,
    /// The mutation.
    pub op: TriggerOp,
    /// Tenant of the trigger.
    pub tenant_id: String,
    /// Id of the trigger within its tenant.
    pub trigger_id: String,
}

impl NotifyTrigger {
    /// Build an envelope.
    pub fn new(
        from_node: NodeId,
        to_node: NodeId,
        op: TriggerOp,
        tenant_id: impl Into<String>,
        trigger_id: impl Into<String>,
    ) -> Self {
        Self {
            from_node,
            to_node,
            op,
            tenant_id: tenant_id.into(),
            trigger_id: trigger_id.into(),
        }
    }

    /// Serialise for the wire.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    /// Deserialise from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl fmt::Display for NotifyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NotifyTrigger[from={}, to={}, op={}, trigger={}/{}]",
            self.from_node, self.to_node, self.op, self.tenant_id, self.trigger_id
        )
    }
}

/// Payload of a sample broadcast: exactly one of a data or an event sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SamplePayload {
    /// A metric datum.
    Data(DataSample),
    /// An event.
    Event(EventSample),
}

/// Envelope broadcasting one runtime sample to every other node.
///
/// The sender reclaims its own entry; every non-sender delivers the payload
/// to its local engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifySample {
    /// Node that published the sample.
    pub from_node: NodeId,
    /// The sample itself.
    pub payload: SamplePayload,
}

impl NotifySample {
    /// Build an envelope.
    pub fn new(from_node: NodeId, payload: SamplePayload) -> Self {
        Self { from_node, payload }
    }

    /// Serialise for the wire.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(bincode::serialize(self)?))
    }

    /// Deserialise from the wire.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}

impl fmt::Display for NotifySample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            SamplePayload::Data(data) => {
                write!(f, "NotifySample[from={}, data={}]", self.from_node, data.id)
            }
            SamplePayload::Event(event) => {
                write!(f, "NotifySample[from={}, event={}]", self.from_node, event.id)
            }
        }
    }
}

/// Bus key for an encoded envelope.
pub fn entry_key(encoded: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(encoded);
    hasher.finish()
}
