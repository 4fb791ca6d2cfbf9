//! Core types shared across the partition manager.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use twox_hash::XxHash32;

/// Node identifier in the cluster.
///
/// Derived from the substrate's canonical member address with a stable
/// 32-bit hash, so every node computes the same id for the same member
/// across process restarts. Distinct members of a view must map to distinct
/// ids; membership stays small enough that the substrate is trusted to keep
/// it that way, and reconciliation rejects a view where it does not hold.
pub type NodeId = u32;

/// Derive the [`NodeId`] for a member's canonical address.
pub fn node_id_for(address: &str) -> NodeId {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(address.as_bytes());
    hasher.finish() as NodeId
}

/// Trigger mutations propagated across the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerOp {
    /// A trigger was created.
    Add,
    /// A trigger definition changed in place.
    Update,
    /// A trigger was deleted.
    Remove,
}

impl fmt::Display for TriggerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerOp::Add => write!(f, "add"),
            TriggerOp::Update => write!(f, "update"),
            TriggerOp::Remove => write!(f, "remove"),
        }
    }
}

/// Identity of a trigger: the `(tenant_id, trigger_id)` pair.
///
/// Both parts are non-empty; equality is structural. The key carries a
/// stable 32-bit [`fingerprint`](Self::fingerprint) used as the
/// consistent-hash input when placing the trigger on a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerKey {
    tenant_id: String,
    trigger_id: String,
}

impl TriggerKey {
    /// Build a key, rejecting empty parts.
    pub fn new(tenant_id: impl Into<String>, trigger_id: impl Into<String>) -> Result<Self> {
        let tenant_id = tenant_id.into();
        let trigger_id = trigger_id.into();
        if tenant_id.is_empty() {
            return Err(Error::InvalidArgument("tenant_id must not be empty".into()));
        }
        if trigger_id.is_empty() {
            return Err(Error::InvalidArgument("trigger_id must not be empty".into()));
        }
        Ok(Self {
            tenant_id,
            trigger_id,
        })
    }

    /// The tenant namespace this trigger belongs to.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// The trigger's id within its tenant.
    pub fn trigger_id(&self) -> &str {
        &self.trigger_id
    }

    /// Stable 32-bit fingerprint of the pair.
    ///
    /// The separator byte keeps `("ab", "c")` and `("a", "bc")` distinct.
    pub fn fingerprint(&self) -> u32 {
        let mut hasher = XxHash32::with_seed(0);
        hasher.write(self.tenant_id.as_bytes());
        hasher.write(&[0x1f]);
        hasher.write(self.trigger_id.as_bytes());
        hasher.finish() as u32
    }
}

impl fmt::Display for TriggerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.trigger_id)
    }
}

/// A runtime metric datum fed into alert evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSample {
    /// Tenant the datum belongs to.
    pub tenant_id: String,
    /// Id of the data source (metric id).
    pub id: String,
    /// Collection time, milliseconds since the epoch.
    pub timestamp: u64,
    /// Numeric value.
    pub value: f64,
}

/// A runtime event fed into alert evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSample {
    /// Tenant the event belongs to.
    pub tenant_id: String,
    /// Unique event id.
    pub id: String,
    /// Creation time, milliseconds since the epoch.
    pub ctime: u64,
    /// Event category.
    pub category: String,
    /// Human-readable event text.
    pub text: String,
}

/// Per-tenant view of trigger assignments: tenant id to sorted trigger ids.
pub type TenantTriggers = BTreeMap<String, Vec<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_parts() {
        assert!(TriggerKey::new("", "t").is_err());
        assert!(TriggerKey::new("tenant", "").is_err());
        assert!(TriggerKey::new("tenant", "t").is_ok());
    }

    #[test]
    fn fingerprint_is_stable_and_structural() {
        let a = TriggerKey::new("t1", "x").unwrap();
        let b = TriggerKey::new("t1", "x").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_separates_pair_boundaries() {
        let a = TriggerKey::new("ab", "c").unwrap();
        let b = TriggerKey::new("a", "bc").unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn node_ids_differ_per_address() {
        let a = node_id_for("alerts-0:9000");
        let b = node_id_for("alerts-1:9000");
        assert_ne!(a, b);
        assert_eq!(a, node_id_for("alerts-0:9000"));
    }
}
