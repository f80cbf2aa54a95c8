//! In-memory cluster view for tests and simulation.
//!
//! `MemCluster` answers every `ClusterView` question from plain maps, so
//! fixtures can describe an arbitrary cluster in a few lines. It is also
//! the backing cluster of the `shardgrid-sim` binary.

use std::collections::{HashMap, HashSet};

use crate::cluster::ClusterView;
use crate::types::{
    HotReplicaStat, Replica, ReplicaRole, ShardDesc, ShardId, StoreDesc, StoreId,
};

const DEFAULT_MIN_HOT_DEGREE: u32 = 3;
const DEFAULT_HOT_SHARD_LIMIT: u64 = 4;
const DEFAULT_LEADER_LIMIT: u64 = 4;

#[derive(Clone)]
pub struct MemCluster {
    stores: HashMap<StoreId, StoreDesc>,
    shards: HashMap<ShardId, ShardDesc>,
    hot_read: HashMap<StoreId, Vec<HotReplicaStat>>,
    hot_write: HashMap<StoreId, Vec<HotReplicaStat>>,
    read_byte_rates: HashMap<StoreId, f64>,
    read_key_rates: HashMap<StoreId, f64>,
    write_byte_rates: HashMap<StoreId, f64>,
    write_key_rates: HashMap<StoreId, f64>,
    min_hot_degree: u32,
    hot_shard_limit: u64,
    leader_limit: u64,
    unhealthy: HashSet<ShardId>,
    under_replicated: HashSet<ShardId>,
    replica_placement_denied: HashSet<(ShardId, StoreId)>,
    leader_placement_denied: HashSet<(ShardId, StoreId)>,
}

impl Default for MemCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemCluster {
    pub fn new() -> Self {
        Self {
            stores: HashMap::new(),
            shards: HashMap::new(),
            hot_read: HashMap::new(),
            hot_write: HashMap::new(),
            read_byte_rates: HashMap::new(),
            read_key_rates: HashMap::new(),
            write_byte_rates: HashMap::new(),
            write_key_rates: HashMap::new(),
            min_hot_degree: DEFAULT_MIN_HOT_DEGREE,
            hot_shard_limit: DEFAULT_HOT_SHARD_LIMIT,
            leader_limit: DEFAULT_LEADER_LIMIT,
            unhealthy: HashSet::new(),
            under_replicated: HashSet::new(),
            replica_placement_denied: HashSet::new(),
            leader_placement_denied: HashSet::new(),
        }
    }

    // ── Fixture helpers ───────────────────────────────────────────

    /// Add a healthy `Up` store.
    pub fn add_store(&mut self, id: StoreId) {
        self.stores.insert(id, StoreDesc::new(id));
    }

    /// Add (or replace) a store with full control over its description.
    pub fn set_store(&mut self, store: StoreDesc) {
        self.stores.insert(store.id, store);
    }

    /// Add a shard with voter replicas on the given stores.
    ///
    /// The leader must be one of the stores.
    pub fn add_shard(&mut self, id: ShardId, stores: &[StoreId], leader: StoreId) {
        let replicas = stores
            .iter()
            .map(|&store_id| Replica {
                store_id,
                role: ReplicaRole::Voter,
            })
            .collect();
        self.shards.insert(
            id,
            ShardDesc {
                id,
                replicas,
                leader,
            },
        );
    }

    pub fn set_shard(&mut self, shard: ShardDesc) {
        self.shards.insert(shard.id, shard);
    }

    pub fn set_read_rates(&mut self, id: StoreId, byte_rate: f64, key_rate: f64) {
        self.read_byte_rates.insert(id, byte_rate);
        self.read_key_rates.insert(id, key_rate);
    }

    pub fn set_write_rates(&mut self, id: StoreId, byte_rate: f64, key_rate: f64) {
        self.write_byte_rates.insert(id, byte_rate);
        self.write_key_rates.insert(id, key_rate);
    }

    pub fn add_hot_read(&mut self, stat: HotReplicaStat) {
        self.hot_read.entry(stat.store_id).or_default().push(stat);
    }

    pub fn add_hot_write(&mut self, stat: HotReplicaStat) {
        self.hot_write.entry(stat.store_id).or_default().push(stat);
    }

    pub fn clear_hot_stats(&mut self) {
        self.hot_read.clear();
        self.hot_write.clear();
    }

    pub fn mark_unhealthy(&mut self, shard: ShardId) {
        self.unhealthy.insert(shard);
    }

    pub fn mark_under_replicated(&mut self, shard: ShardId) {
        self.under_replicated.insert(shard);
    }

    pub fn deny_replica_placement(&mut self, shard: ShardId, store: StoreId) {
        self.replica_placement_denied.insert((shard, store));
    }

    pub fn deny_leader_placement(&mut self, shard: ShardId, store: StoreId) {
        self.leader_placement_denied.insert((shard, store));
    }

    pub fn set_min_hot_degree(&mut self, degree: u32) {
        self.min_hot_degree = degree;
    }

    pub fn set_schedule_limits(&mut self, hot_shard: u64, leader: u64) {
        self.hot_shard_limit = hot_shard;
        self.leader_limit = leader;
    }
}

impl ClusterView for MemCluster {
    fn stores(&self) -> Vec<StoreDesc> {
        self.stores.values().cloned().collect()
    }

    fn store(&self, id: StoreId) -> Option<StoreDesc> {
        self.stores.get(&id).cloned()
    }

    fn shard(&self, id: ShardId) -> Option<ShardDesc> {
        self.shards.get(&id).cloned()
    }

    fn follower_stores(&self, shard: &ShardDesc) -> Vec<StoreDesc> {
        shard
            .followers()
            .into_iter()
            .filter_map(|id| self.stores.get(&id).cloned())
            .collect()
    }

    fn hot_read_replicas(&self) -> HashMap<StoreId, Vec<HotReplicaStat>> {
        self.hot_read.clone()
    }

    fn hot_write_replicas(&self) -> HashMap<StoreId, Vec<HotReplicaStat>> {
        self.hot_write.clone()
    }

    fn store_read_byte_rates(&self) -> HashMap<StoreId, f64> {
        self.read_byte_rates.clone()
    }

    fn store_read_key_rates(&self) -> HashMap<StoreId, f64> {
        self.read_key_rates.clone()
    }

    fn store_write_byte_rates(&self) -> HashMap<StoreId, f64> {
        self.write_byte_rates.clone()
    }

    fn store_write_key_rates(&self) -> HashMap<StoreId, f64> {
        self.write_key_rates.clone()
    }

    fn min_hot_degree(&self) -> u32 {
        self.min_hot_degree
    }

    fn hot_shard_schedule_limit(&self) -> u64 {
        self.hot_shard_limit
    }

    fn leader_schedule_limit(&self) -> u64 {
        self.leader_limit
    }

    fn is_shard_healthy(&self, shard: &ShardDesc) -> bool {
        !self.unhealthy.contains(&shard.id)
    }

    fn is_shard_replicated(&self, shard: &ShardDesc) -> bool {
        !self.under_replicated.contains(&shard.id)
    }

    fn placement_allows_replica(
        &self,
        shard: &ShardDesc,
        _from: &StoreDesc,
        to: &StoreDesc,
    ) -> bool {
        !self.replica_placement_denied.contains(&(shard.id, to.id))
    }

    fn placement_allows_leader(&self, shard: &ShardDesc, to: &StoreDesc) -> bool {
        !self.leader_placement_denied.contains(&(shard.id, to.id))
    }
}
