//! Configuration for the partition manager.

use std::time::Duration;

/// Configuration for [`PartitionManager`](crate::PartitionManager).
#[derive(Debug, Clone)]
pub struct PartitionConfig {
    /// Upper bound on the cold-start load from the definitions store.
    ///
    /// The load runs on a worker thread; when it exceeds this bound the
    /// reconciliation proceeds with an empty trigger set and the partition
    /// fills back in through later trigger notifications.
    pub definitions_timeout: Duration,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            definitions_timeout: Duration::from_secs(30),
        }
    }
}

impl PartitionConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cold-start definitions load bound.
    pub fn with_definitions_timeout(mut self, timeout: Duration) -> Self {
        self.definitions_timeout = timeout;
        self
    }
}
