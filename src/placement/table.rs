//! Bucket table construction.
//!
//! The bucket table is the indirection between the consistent-hash result
//! and a concrete node: bucket indexes `0..n` map onto the `n` current
//! members. Rebuilding on a membership change keeps every surviving node at
//! its index wherever possible, so the jump hash moves as few triggers as
//! the topology change forces.

use crate::error::{Error, Result};
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Mapping from bucket index to the node that owns it.
///
/// After a rebuild the table is a bijection: domain `[0, n)`, range exactly
/// the current member set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketTable {
    slots: BTreeMap<u32, NodeId>,
}

impl BucketTable {
    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the table holds no buckets.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Node owning the given bucket index.
    pub fn node_at(&self, bucket: u32) -> Option<NodeId> {
        self.slots.get(&bucket).copied()
    }

    /// Whether a node owns any bucket.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.slots.values().any(|&candidate| candidate == node)
    }

    /// Iterate `(bucket, node)` pairs in ascending bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, NodeId)> + '_ {
        self.slots.iter().map(|(&bucket, &node)| (bucket, node))
    }

    /// Iterate the nodes in ascending bucket order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.values().copied()
    }

    /// Rebuild the table for a new member list.
    ///
    /// `members` is the substrate's view in canonical order, deduplicated
    /// and non-empty. Placement rules, per bucket in ascending order:
    ///
    /// 1. a surviving member whose old index equals the bucket keeps it;
    /// 2. otherwise a surviving member parked at a collapsed index (`>= n`)
    ///    fills the bucket, lowest old index first;
    /// 3. otherwise the first member in canonical order that is neither
    ///    placed nor pinned to its own surviving index fills it.
    ///
    /// Rule 3 deliberately skips members pinned by rule 1: handing such a
    /// member an earlier vacated slot would evict it from the index it is
    /// about to keep, reshuffling triggers that did not have to move.
    pub fn rebuild(old: Option<&BucketTable>, members: &[NodeId]) -> Result<BucketTable> {
        if members.is_empty() {
            return Err(Error::InvalidArgument("members must not be empty".into()));
        }
        let mut distinct = HashSet::with_capacity(members.len());
        for &member in members {
            if !distinct.insert(member) {
                return Err(Error::InvalidArgument(format!(
                    "duplicate member {member} in view"
                )));
            }
        }
        let n = members.len() as u32;

        let old = match old {
            Some(table) if !table.is_empty() => table,
            _ => {
                let slots = members
                    .iter()
                    .enumerate()
                    .map(|(i, &member)| (i as u32, member))
                    .collect();
                return Ok(BucketTable { slots });
            }
        };

        // Survivors below the new size are pinned to their index; survivors
        // at collapsed indexes queue up for vacated slots, lowest old index
        // first, ahead of the joiners.
        let mut pinned: HashMap<u32, NodeId> = HashMap::new();
        let mut survivors: HashSet<NodeId> = HashSet::new();
        let mut spare: VecDeque<NodeId> = VecDeque::new();
        for (bucket, node) in old.iter() {
            if distinct.contains(&node) && survivors.insert(node) {
                if bucket < n {
                    pinned.insert(bucket, node);
                } else {
                    spare.push_back(node);
                }
            }
        }
        for &member in members {
            if !survivors.contains(&member) {
                spare.push_back(member);
            }
        }

        let mut slots = BTreeMap::new();
        for bucket in 0..n {
            let node = match pinned.get(&bucket) {
                Some(&node) => node,
                // Pinned and spare members partition the member set, so a
                // spare exists for every unpinned bucket.
                None => spare.pop_front().expect("spare member for unpinned bucket"),
            };
            slots.insert(bucket, node);
        }
        Ok(BucketTable { slots })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(u32, NodeId)]) -> BucketTable {
        BucketTable {
            slots: pairs.iter().copied().collect(),
        }
    }

    fn assert_bijection(table: &BucketTable, members: &[NodeId]) {
        assert_eq!(table.len(), members.len());
        let domain: Vec<u32> = table.iter().map(|(bucket, _)| bucket).collect();
        assert_eq!(domain, (0..members.len() as u32).collect::<Vec<_>>());
        let mut range: Vec<NodeId> = table.nodes().collect();
        range.sort_unstable();
        let mut expected: Vec<NodeId> = members.to_vec();
        expected.sort_unstable();
        assert_eq!(range, expected);
    }

    #[test]
    fn initial_build_follows_member_order() {
        let built = BucketTable::rebuild(None, &[1000, 2000, 3000]).unwrap();
        assert_eq!(built, table(&[(0, 1000), (1, 2000), (2, 3000)]));
    }

    #[test]
    fn empty_old_table_behaves_like_initial_build() {
        let empty = BucketTable::default();
        let built = BucketTable::rebuild(Some(&empty), &[7, 8]).unwrap();
        assert_eq!(built, table(&[(0, 7), (1, 8)]));
    }

    #[test]
    fn rejects_empty_members() {
        assert!(BucketTable::rebuild(None, &[]).is_err());
    }

    #[test]
    fn rejects_duplicate_members() {
        assert!(BucketTable::rebuild(None, &[5, 5]).is_err());
    }

    #[test]
    fn joiner_takes_the_new_bucket() {
        let old = table(&[(0, 1000), (1, 2000)]);
        let built = BucketTable::rebuild(Some(&old), &[1000, 2000, 3000]).unwrap();
        assert_eq!(built, table(&[(0, 1000), (1, 2000), (2, 3000)]));
    }

    #[test]
    fn shrink_collapses_overflow_onto_vacated_slot() {
        let old = table(&[(0, 1000), (1, 2000), (2, 3000)]);
        let built = BucketTable::rebuild(Some(&old), &[1000, 3000]).unwrap();
        assert_eq!(built, table(&[(0, 1000), (1, 3000)]));
    }

    #[test]
    fn joiner_fills_a_vacated_low_slot() {
        let old = table(&[(0, 77), (1, 88)]);
        // 77 left, 99 joined; 88 must keep bucket 1.
        let built = BucketTable::rebuild(Some(&old), &[88, 99]).unwrap();
        assert_eq!(built, table(&[(0, 99), (1, 88)]));
    }

    #[test]
    fn survivor_is_never_pulled_off_its_index() {
        // A joiner in canonical order ahead of a survivor must not steal the
        // vacated bucket 0 from under the survivor pinned at bucket 1.
        let old = table(&[(1, 10)]);
        let built = BucketTable::rebuild(Some(&old), &[10, 20]).unwrap();
        assert_eq!(built, table(&[(0, 20), (1, 10)]));
    }

    #[test]
    fn overflow_survivors_collapse_lowest_first() {
        let old = table(&[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
        // 1 and 2 left; 3, 4, 5 survive a shrink to three buckets.
        let built = BucketTable::rebuild(Some(&old), &[3, 4, 5]).unwrap();
        assert_eq!(built, table(&[(0, 4), (1, 5), (2, 3)]));
    }

    #[test]
    fn stays_a_bijection_across_membership_churn() {
        let mut current: Option<BucketTable> = None;
        let histories: Vec<Vec<NodeId>> = vec![
            vec![1, 2, 3],
            vec![1, 2, 3, 4],
            vec![1, 3, 4],
            vec![3, 4],
            vec![3, 4, 5, 6, 7],
            vec![7],
            vec![7, 8, 9],
        ];
        for members in histories {
            let built = BucketTable::rebuild(current.as_ref(), &members).unwrap();
            assert_bijection(&built, &members);
            // Survivor stability: a member keeping a low index keeps it.
            if let Some(previous) = &current {
                for (bucket, node) in previous.iter() {
                    if bucket < members.len() as u32 && members.contains(&node) {
                        assert_eq!(built.node_at(bucket), Some(node));
                    }
                }
            }
            current = Some(built);
        }
    }
}
