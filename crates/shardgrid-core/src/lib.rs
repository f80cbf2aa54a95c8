//! shardgrid-core — domain types and the cluster view.
//!
//! The types here describe the world the scheduler reasons about:
//!
//! - `StoreDesc` — a storage node hosting shard replicas
//! - `ShardDesc` — a replicated key range with one leader replica
//! - `HotReplicaStat` — the observed read/write rate of a single replica
//! - `ClusterView` — the interface the scheduler uses to inspect the
//!   cluster (catalog, statistics, placement rules, limits)
//! - `MemCluster` — an in-memory `ClusterView` for tests and simulation

pub mod cluster;
pub mod filter;
pub mod mem;
pub mod types;

pub use cluster::ClusterView;
pub use filter::{ExcludedFilter, FilterAction, ReservedUseFilter, StoreFilter, StoreStateFilter};
pub use mem::MemCluster;
pub use types::{
    HotReplicaStat, Replica, ReplicaRole, ShardDesc, ShardId, StoreDesc, StoreId, StoreState,
};
