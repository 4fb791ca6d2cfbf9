//! The shared partition state: assignment maps and their replicated cells.

mod map;
mod state;

pub use map::Partition;
pub use state::{PartitionState, BUCKETS_KEY, CURRENT_KEY, PREVIOUS_KEY};
