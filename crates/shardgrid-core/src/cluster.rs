//! The cluster view — everything the scheduler is allowed to ask the
//! surrounding cluster manager.
//!
//! The scheduler treats every answer as a point-in-time snapshot; the
//! implementation behind this trait owns its own concurrency discipline.

use std::collections::HashMap;

use crate::types::{HotReplicaStat, ShardDesc, ShardId, StoreDesc, StoreId};

pub trait ClusterView {
    /// All known stores, regardless of state.
    fn stores(&self) -> Vec<StoreDesc>;

    fn store(&self, id: StoreId) -> Option<StoreDesc>;

    fn shard(&self, id: ShardId) -> Option<ShardDesc>;

    /// Stores holding a non-leader replica of the shard.
    fn follower_stores(&self, shard: &ShardDesc) -> Vec<StoreDesc>;

    /// Hot replicas by store, from the read-flow statistics cache.
    fn hot_read_replicas(&self) -> HashMap<StoreId, Vec<HotReplicaStat>>;

    /// Hot replicas by store, from the write-flow statistics cache.
    fn hot_write_replicas(&self) -> HashMap<StoreId, Vec<HotReplicaStat>>;

    fn store_read_byte_rates(&self) -> HashMap<StoreId, f64>;
    fn store_read_key_rates(&self) -> HashMap<StoreId, f64>;
    fn store_write_byte_rates(&self) -> HashMap<StoreId, f64>;
    fn store_write_key_rates(&self) -> HashMap<StoreId, f64>;

    /// Minimum hot degree for a replica to count as hot.
    fn min_hot_degree(&self) -> u32;

    /// Maximum number of concurrent hot-shard operators.
    fn hot_shard_schedule_limit(&self) -> u64;

    /// Maximum number of concurrent leader-transfer operators.
    fn leader_schedule_limit(&self) -> u64;

    /// Whether the shard's replicas are healthy enough to schedule
    /// (down or pending replicas block everything but their repair).
    fn is_shard_healthy(&self, shard: &ShardDesc) -> bool;

    /// Whether the shard currently has its configured replica count.
    fn is_shard_replicated(&self, shard: &ShardDesc) -> bool;

    /// Placement-rule safeguard for moving a replica from `from` to `to`.
    fn placement_allows_replica(&self, shard: &ShardDesc, from: &StoreDesc, to: &StoreDesc)
        -> bool;

    /// Placement-rule safeguard for moving shard leadership to `to`.
    fn placement_allows_leader(&self, shard: &ShardDesc, to: &StoreDesc) -> bool;
}
