//! Trigger placement: consistent hashing over an indexed bucket table.
//!
//! Placement is a pure two-step lookup:
//!
//! ```text
//! TriggerKey ──fingerprint──▶ u32 ──jump hash──▶ bucket ──table──▶ NodeId
//! ```
//!
//! The bucket table ([`BucketTable`]) maps indexes `0..n` onto the `n`
//! current members and is rebuilt on every membership change so that
//! surviving nodes keep their index wherever possible. Combined with the
//! jump hash ([`jump_bucket`]), a single join or leave reassigns only the
//! share of triggers the topology change forces.

mod assign;
mod jump;
mod table;

pub use assign::{compute_partition, place_of};
pub use jump::jump_bucket;
pub use table::BucketTable;
