//! Partition manager for a clustered, multi-tenant alerting engine.
//!
//! This crate decides which cluster node owns each *trigger* (a
//! tenant-scoped alert-evaluation unit) and propagates trigger lifecycle
//! events and runtime data/event samples among nodes, so that every sample
//! is evaluated on exactly the owner node.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Alert Engine                           │
//! │   notify_trigger / notify_data / notify_event                │
//! │   PartitionTriggerListener / PartitionDataListener           │
//! └─────────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     PartitionManager                         │
//! │  • reconciles on view changes (coordinator only)             │
//! │  • routes trigger mutations to their owner node              │
//! │  • broadcasts samples to every other node                    │
//! └─────────────────────────────────────────────────────────────┘
//!        │                    │                    │
//!        ▼                    ▼                    ▼
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │  Placement  │      │  Partition  │      │  Substrate  │
//! │ jump hash + │      │ state cells │      │ membership +│
//! │bucket table │      │ and deltas  │      │ repl. store │
//! └─────────────┘      └─────────────┘      └─────────────┘
//! ```
//!
//! Placement is consistent hashing in two steps: a trigger key fingerprint
//! is jump-hashed onto a bucket index, and an indexed bucket table maps
//! buckets onto the current members. The table is rebuilt with minimal
//! churn on every membership change, so a join or leave reassigns only the
//! share of triggers the topology change forces.
//!
//! The shared state (`BUCKETS`, `CURRENT`, `PREVIOUS`) lives in a
//! replicated keyed store behind the [`Substrate`] trait, together with two
//! ephemeral bus cells used to fan trigger and sample envelopes out to all
//! nodes. [`LocalCluster`] is the in-process reference substrate.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tocsin::testing::FixedDefinitions;
//! use tocsin::{DataSample, LocalCluster, PartitionConfig, PartitionManager, TriggerOp};
//!
//! let cluster = LocalCluster::new();
//! let substrate = Arc::new(cluster.join("alerts-0:9000"));
//! let definitions = Arc::new(FixedDefinitions::empty());
//!
//! let manager = PartitionManager::new(substrate, definitions, PartitionConfig::default());
//! manager.start();
//!
//! // Tell the cluster about a trigger mutation; the owner node applies it.
//! manager.notify_trigger(TriggerOp::Add, "tenant-1", "cpu-high");
//!
//! // Broadcast a runtime sample; every other node evaluates it.
//! manager.notify_data(DataSample {
//!     tenant_id: "tenant-1".into(),
//!     id: "cpu".into(),
//!     timestamp: 1_700_000_000_000,
//!     value: 98.5,
//! });
//! ```
//!
//! # Consistency model
//!
//! The partition map is eventually consistent: the coordinator rewrites it
//! on topology changes, trigger owners patch it for single mutations, and
//! a lost bus entry is repaired by the engine's next reconciliation.
//! Samples are delivered at most once per non-sender node.

pub mod bus;
pub mod config;
pub mod definitions;
pub mod error;
pub mod listeners;
pub mod local;
pub mod manager;
pub mod partition;
pub mod placement;
pub mod substrate;
pub mod testing;
pub mod types;

// Re-export main types for convenience
pub use config::PartitionConfig;
pub use error::{Error, ListenerError, Result};
pub use manager::PartitionManager;
pub use types::{
    node_id_for, DataSample, EventSample, NodeId, TenantTriggers, TriggerKey, TriggerOp,
};

// Re-export placement types
pub use placement::{compute_partition, jump_bucket, place_of, BucketTable};

// Re-export partition state types
pub use partition::{Partition, PartitionState};

// Re-export bus envelope types
pub use bus::{entry_key, NotifySample, NotifyTrigger, SamplePayload};

// Re-export the substrate contract and its in-process implementation
pub use local::{LocalCluster, LocalSubstrate};
pub use substrate::{Cell, Substrate, SubstrateListener};

// Re-export external collaborator contracts
pub use definitions::DefinitionsProvider;
pub use listeners::{
    LoggingDataListener, LoggingTriggerListener, NoopDataListener, NoopTriggerListener,
    PartitionDataListener, PartitionTriggerListener,
};
