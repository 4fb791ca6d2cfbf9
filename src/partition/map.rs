//! The trigger-to-node assignment map.

use crate::types::{NodeId, TenantTriggers, TriggerKey};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Assignment of every known trigger to its owner node.
///
/// The canonical copy lives in the replicated partition cell; everything
/// else works on read-only snapshots of it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Partition {
    assignments: HashMap<TriggerKey, NodeId>,
}

impl Partition {
    /// Create an empty partition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of assigned triggers.
    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    /// Whether no trigger is assigned.
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Whether the trigger is assigned to any node.
    pub fn contains(&self, key: &TriggerKey) -> bool {
        self.assignments.contains_key(key)
    }

    /// Owner of the trigger, if assigned.
    pub fn node_for(&self, key: &TriggerKey) -> Option<NodeId> {
        self.assignments.get(key).copied()
    }

    /// Assign a trigger to a node.
    pub fn assign(&mut self, key: TriggerKey, node: NodeId) {
        self.assignments.insert(key, node);
    }

    /// Drop a trigger regardless of which node the mapping points at.
    pub fn unassign(&mut self, key: &TriggerKey) {
        self.assignments.remove(key);
    }

    /// Iterate the assigned trigger keys.
    pub fn keys(&self) -> impl Iterator<Item = &TriggerKey> + '_ {
        self.assignments.keys()
    }

    /// Iterate `(key, node)` assignments.
    pub fn iter(&self) -> impl Iterator<Item = (&TriggerKey, NodeId)> + '_ {
        self.assignments.iter().map(|(key, &node)| (key, node))
    }

    /// The slice of this partition owned by `node`, grouped per tenant with
    /// trigger ids sorted.
    pub fn tenant_view(&self, node: NodeId) -> TenantTriggers {
        let mut view = TenantTriggers::new();
        for (key, owner) in &self.assignments {
            if *owner == node {
                view.entry(key.tenant_id().to_string())
                    .or_default()
                    .push(key.trigger_id().to_string());
            }
        }
        for triggers in view.values_mut() {
            triggers.sort_unstable();
        }
        view
    }

    /// Added and removed slices for `node` between two partitions.
    ///
    /// `added` holds the keys `node` owns in `current` but not in
    /// `previous`; `removed` the reverse.
    pub fn diff(
        previous: &Partition,
        current: &Partition,
        node: NodeId,
    ) -> (TenantTriggers, TenantTriggers) {
        let previous_slice = previous.node_keys(node);
        let current_slice = current.node_keys(node);
        let added = collect(current_slice.difference(&previous_slice));
        let removed = collect(previous_slice.difference(&current_slice));
        (added, removed)
    }

    fn node_keys(&self, node: NodeId) -> HashSet<&TriggerKey> {
        self.assignments
            .iter()
            .filter(|(_, &owner)| owner == node)
            .map(|(key, _)| key)
            .collect()
    }
}

fn collect<'a, 'b: 'a>(keys: impl Iterator<Item = &'a &'b TriggerKey>) -> TenantTriggers {
    let mut view = TenantTriggers::new();
    for key in keys {
        view.entry(key.tenant_id().to_string())
            .or_default()
            .push(key.trigger_id().to_string());
    }
    for triggers in view.values_mut() {
        triggers.sort_unstable();
    }
    view
}
