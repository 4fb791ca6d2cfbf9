//! Trigger placement over the bucket table.

use super::jump::jump_bucket;
use super::table::BucketTable;
use crate::error::{Error, Result};
use crate::partition::Partition;
use crate::types::{NodeId, TriggerKey};
use std::hash::Hasher;
use twox_hash::XxHash32;

/// Place a trigger on a node.
///
/// The key's fingerprint is re-hashed, jump-hashed to a bucket in
/// `[0, buckets.len())`, and the bucket looked up in the table. Pure and
/// deterministic: the same key and table always yield the same node.
pub fn place_of(key: &TriggerKey, buckets: &BucketTable) -> Result<NodeId> {
    if buckets.is_empty() {
        return Err(Error::InvalidArgument("buckets must not be empty".into()));
    }
    let bucket = jump_bucket(u64::from(spread(key.fingerprint())), buckets.len() as u32);
    buckets.node_at(bucket).ok_or_else(|| {
        Error::InvalidArgument(format!("bucket {bucket} missing from table"))
    })
}

/// Place every entry, producing a full partition.
pub fn compute_partition(
    entries: impl IntoIterator<Item = TriggerKey>,
    buckets: &BucketTable,
) -> Result<Partition> {
    if buckets.is_empty() {
        return Err(Error::InvalidArgument("buckets must not be empty".into()));
    }
    let mut partition = Partition::new();
    for entry in entries {
        let node = place_of(&entry, buckets)?;
        partition.assign(entry, node);
    }
    Ok(partition)
}

/// Re-hash a fingerprint so clustered fingerprints spread over the whole
/// 32-bit space before the jump hash consumes them.
fn spread(fingerprint: u32) -> u32 {
    let mut hasher = XxHash32::with_seed(0);
    hasher.write(&fingerprint.to_le_bytes());
    hasher.finish() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(count: usize) -> Vec<TriggerKey> {
        (0..count)
            .map(|i| TriggerKey::new(format!("tenant-{}", i % 7), format!("trigger-{i}")).unwrap())
            .collect()
    }

    #[test]
    fn placement_is_deterministic() {
        let buckets = BucketTable::rebuild(None, &[10, 20, 30]).unwrap();
        for key in keys(64) {
            assert_eq!(
                place_of(&key, &buckets).unwrap(),
                place_of(&key, &buckets).unwrap()
            );
        }
    }

    #[test]
    fn rejects_empty_buckets() {
        let key = TriggerKey::new("t1", "x").unwrap();
        let empty = BucketTable::default();
        assert!(place_of(&key, &empty).is_err());
        assert!(compute_partition([key], &empty).is_err());
        assert!(compute_partition([], &empty).is_err());
    }

    #[test]
    fn partition_is_total_over_entries() {
        let buckets = BucketTable::rebuild(None, &[10, 20, 30]).unwrap();
        let entries = keys(100);
        let partition = compute_partition(entries.clone(), &buckets).unwrap();
        assert_eq!(partition.len(), entries.len());
        for entry in &entries {
            let node = partition.node_for(entry).unwrap();
            assert!(buckets.contains_node(node));
            assert_eq!(node, place_of(entry, &buckets).unwrap());
        }
    }

    #[test]
    fn adding_a_node_moves_a_bounded_share_to_it() {
        let entries = keys(1200);
        let three = BucketTable::rebuild(None, &[10, 20, 30]).unwrap();
        let four = BucketTable::rebuild(Some(&three), &[10, 20, 30, 40]).unwrap();

        let before = compute_partition(entries.clone(), &three).unwrap();
        let after = compute_partition(entries.clone(), &four).unwrap();

        let mut moved = 0;
        for entry in &entries {
            let old_node = before.node_for(entry).unwrap();
            let new_node = after.node_for(entry).unwrap();
            if old_node != new_node {
                // Every reassigned trigger lands on the joiner.
                assert_eq!(new_node, 40);
                moved += 1;
            }
        }
        // The jump hash sends ~1/4 of the keys to the new bucket.
        assert!(moved > 0, "some keys must move to the new node");
        assert!(moved < 450, "{moved} of 1200 keys moved, expected about 300");
    }

    #[test]
    fn removing_a_node_keeps_low_bucket_owners() {
        let entries = keys(600);
        let three = BucketTable::rebuild(None, &[10, 20, 30]).unwrap();
        let two = BucketTable::rebuild(Some(&three), &[10, 20]).unwrap();

        let before = compute_partition(entries.clone(), &three).unwrap();
        let after = compute_partition(entries.clone(), &two).unwrap();

        for entry in &entries {
            let old_node = before.node_for(entry).unwrap();
            let new_node = after.node_for(entry).unwrap();
            assert_ne!(new_node, 30, "departed node must own nothing");
            if old_node != 30 {
                // Keys outside the collapsed bucket keep their owner.
                assert_eq!(old_node, new_node);
            }
        }
    }
}
