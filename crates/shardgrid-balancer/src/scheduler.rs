//! The hot-shard balancer facade.
//!
//! `HotShardBalancer` owns all mutable scheduling state behind one
//! read-write lock: a tick (summarize → solve → register pending) runs
//! under the write lock, status readers copy out under the read lock.
//! The solver itself works on the summarized snapshot and never blocks.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use shardgrid_core::{ClusterView, StoreId};
use shardgrid_operator::{OpGroup, Operator, OperatorBook};

use crate::config::BalancerConfig;
use crate::counters::{inc, CountersSnapshot, SchedulerCounters};
use crate::kinds::{OpKind, ResourceType, RwKind};
use crate::load::Influence;
use crate::pending::PendingTracker;
use crate::solver::BalanceSolver;
use crate::summary::{summarize_stores_load, StoreHotShardsInfos, StoreLoadDetail};

/// Cadence floor: a tick that produced an operator reschedules this soon.
pub const MIN_SCHEDULE_INTERVAL: Duration = Duration::from_secs(1);

/// Cadence ceiling for idle growth.
pub const MAX_SCHEDULE_INTERVAL: Duration = Duration::from_secs(20);

const INTERVAL_GROWTH_FACTOR: f64 = 1.3;

/// Probability that a write tick tries the replica mover before the
/// leader transferrer.
const SCHEDULE_REPLICA_PR: f64 = 0.66;

struct BalancerInner {
    rng: StdRng,
    tracker: PendingTracker,
    st_load_infos: [HashMap<StoreId, StoreLoadDetail>; ResourceType::LEN],
    pending_sums: [HashMap<StoreId, Influence>; ResourceType::LEN],
}

pub struct HotShardBalancer {
    conf: BalancerConfig,
    book: Arc<OperatorBook>,
    kinds: Vec<RwKind>,
    counters: SchedulerCounters,
    inner: RwLock<BalancerInner>,
}

impl HotShardBalancer {
    pub fn new(conf: BalancerConfig, book: Arc<OperatorBook>) -> Self {
        Self::with_rng(conf, book, StdRng::from_entropy())
    }

    /// Deterministic variant for tests and simulation.
    pub fn seeded(conf: BalancerConfig, book: Arc<OperatorBook>, seed: u64) -> Self {
        Self::with_rng(conf, book, StdRng::seed_from_u64(seed))
    }

    fn with_rng(conf: BalancerConfig, book: Arc<OperatorBook>, rng: StdRng) -> Self {
        let tracker = PendingTracker::new(conf.max_zombie_duration());
        Self {
            conf,
            book,
            kinds: vec![RwKind::Write, RwKind::Read],
            counters: SchedulerCounters::default(),
            inner: RwLock::new(BalancerInner {
                rng,
                tracker,
                st_load_infos: Default::default(),
                pending_sums: Default::default(),
            }),
        }
    }

    /// Restrict which flows this balancer handles (default: both).
    pub fn with_kinds(mut self, kinds: Vec<RwKind>) -> Self {
        self.kinds = kinds;
        self
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, BalancerInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, BalancerInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &BalancerConfig {
        &self.conf
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    pub fn min_interval(&self) -> Duration {
        MIN_SCHEDULE_INTERVAL
    }

    /// Exponential idle back-off, capped.
    pub fn next_interval(&self, prev: Duration) -> Duration {
        let grown = prev.as_secs_f64() * INTERVAL_GROWTH_FACTOR;
        Duration::from_secs_f64(grown.min(MAX_SCHEDULE_INTERVAL.as_secs_f64()))
            .max(MIN_SCHEDULE_INTERVAL)
    }

    pub fn is_schedule_allowed(&self, cluster: &dyn ClusterView) -> bool {
        self.allow_balance_leader(cluster) || self.allow_balance_shard(cluster)
    }

    fn allow_balance_leader(&self, cluster: &dyn ClusterView) -> bool {
        self.book.operator_count(OpGroup::HotShard) < cluster.hot_shard_schedule_limit()
            && self.book.operator_count(OpGroup::Leader) < cluster.leader_schedule_limit()
    }

    fn allow_balance_shard(&self, cluster: &dyn ClusterView) -> bool {
        self.book.operator_count(OpGroup::HotShard) < cluster.hot_shard_schedule_limit()
    }

    fn allow_balance(&self, cluster: &dyn ClusterView, op_kind: OpKind) -> bool {
        match op_kind {
            OpKind::MoveReplica => self.allow_balance_shard(cluster),
            OpKind::TransferLeader => self.allow_balance_leader(cluster),
        }
    }

    /// One scheduling tick. Returns zero or one operator.
    pub fn schedule(&self, cluster: &dyn ClusterView) -> Vec<Arc<Operator>> {
        inc(&self.counters.schedule);
        if self.kinds.is_empty() {
            return Vec::new();
        }
        let mut inner = self.write_inner();
        let rw = self.kinds[inner.rng.gen_range(0..self.kinds.len())];
        self.dispatch(&mut inner, rw, cluster)
    }

    fn dispatch(
        &self,
        inner: &mut BalancerInner,
        rw: RwKind,
        cluster: &dyn ClusterView,
    ) -> Vec<Arc<Operator>> {
        self.prepare_for_balance(inner, cluster);
        match rw {
            RwKind::Read => self.balance_hot_read(inner, cluster),
            RwKind::Write => self.balance_hot_write(inner, cluster),
        }
    }

    /// Recompute pending sums and rebuild the per-store load details for
    /// every resource type from the cluster's latest statistics.
    fn prepare_for_balance(&self, inner: &mut BalancerInner, cluster: &dyn ClusterView) {
        inner.pending_sums = inner.tracker.summarize(Instant::now());
        let min_hot_degree = cluster.min_hot_degree();

        let read_leader = summarize_stores_load(
            &cluster.store_read_byte_rates(),
            &cluster.store_read_key_rates(),
            &inner.pending_sums[ResourceType::ReadLeader.index()],
            &cluster.hot_read_replicas(),
            min_hot_degree,
            RwKind::Read,
            ResourceType::ReadLeader.stat_kind(),
        );

        let write_byte_rates = cluster.store_write_byte_rates();
        let write_key_rates = cluster.store_write_key_rates();
        let hot_write = cluster.hot_write_replicas();
        let write_leader = summarize_stores_load(
            &write_byte_rates,
            &write_key_rates,
            &inner.pending_sums[ResourceType::WriteLeader.index()],
            &hot_write,
            min_hot_degree,
            RwKind::Write,
            ResourceType::WriteLeader.stat_kind(),
        );
        let write_replica = summarize_stores_load(
            &write_byte_rates,
            &write_key_rates,
            &inner.pending_sums[ResourceType::WriteReplica.index()],
            &hot_write,
            min_hot_degree,
            RwKind::Write,
            ResourceType::WriteReplica.stat_kind(),
        );

        inner.st_load_infos[ResourceType::ReadLeader.index()] = read_leader;
        inner.st_load_infos[ResourceType::WriteLeader.index()] = write_leader;
        inner.st_load_infos[ResourceType::WriteReplica.index()] = write_replica;
    }

    /// Reads prefer rebalancing by leadership: cheaper, and read load
    /// follows the leader.
    fn balance_hot_read(
        &self,
        inner: &mut BalancerInner,
        cluster: &dyn ClusterView,
    ) -> Vec<Arc<Operator>> {
        let ops = self.run_solver(inner, cluster, RwKind::Read, OpKind::TransferLeader);
        if !ops.is_empty() {
            return ops;
        }
        let ops = self.run_solver(inner, cluster, RwKind::Read, OpKind::MoveReplica);
        if !ops.is_empty() {
            return ops;
        }
        inc(&self.counters.skip);
        Vec::new()
    }

    /// Writes prefer moving the replica, most of the time: leadership
    /// transfers do not shed apply traffic.
    fn balance_hot_write(
        &self,
        inner: &mut BalancerInner,
        cluster: &dyn ClusterView,
    ) -> Vec<Arc<Operator>> {
        let coin = inner.rng.gen_range(0..100);
        if f64::from(coin) < SCHEDULE_REPLICA_PR * 100.0 {
            let ops = self.run_solver(inner, cluster, RwKind::Write, OpKind::MoveReplica);
            if !ops.is_empty() {
                return ops;
            }
        }

        let ops = self.run_solver(inner, cluster, RwKind::Write, OpKind::TransferLeader);
        if !ops.is_empty() {
            return ops;
        }
        inc(&self.counters.skip);
        Vec::new()
    }

    fn run_solver(
        &self,
        inner: &mut BalancerInner,
        cluster: &dyn ClusterView,
        rw: RwKind,
        op_kind: OpKind,
    ) -> Vec<Arc<Operator>> {
        if !self.allow_balance(cluster, op_kind) {
            return Vec::new();
        }
        let resource = ResourceType::of(rw, op_kind);

        let scheduled = {
            let detail = &inner.st_load_infos[resource.index()];
            let shard_pendings = inner.tracker.shard_pendings();
            let mut solver = BalanceSolver::new(
                cluster,
                &self.conf,
                &self.counters,
                detail,
                shard_pendings,
                rw,
                op_kind,
            );
            debug_assert_eq!(solver.resource_type(), resource);
            solver.solve(Instant::now())
        };
        let Some(s) = scheduled else {
            return Vec::new();
        };

        if inner
            .tracker
            .add(s.op.clone(), s.from, s.to, s.influence, resource, op_kind)
        {
            inc(&self.counters.pending_op_create);
            info!(
                kind = %rw,
                op = %op_kind,
                shard = s.shard_id,
                from = s.from,
                to = s.to,
                rank = s.rank,
                bytes = s.influence.byte_rate,
                keys = s.influence.key_rate,
                "generated hot-shard operator"
            );
            vec![s.op]
        } else {
            inc(&self.counters.pending_op_fails);
            info!(
                kind = %rw,
                op = %op_kind,
                shard = s.shard_id,
                from = s.from,
                to = s.to,
                rank = s.rank,
                "hot-shard operator dropped, shard already has a pending operator"
            );
            Vec::new()
        }
    }

    // ── Status snapshots ──────────────────────────────────────────

    pub fn hot_read_status(&self) -> StoreHotShardsInfos {
        let inner = self.read_inner();
        StoreHotShardsInfos {
            as_leader: inner.st_load_infos[ResourceType::ReadLeader.index()]
                .iter()
                .map(|(&id, d)| (id, d.to_hot_shards_stat()))
                .collect(),
            as_replica: HashMap::new(),
        }
    }

    pub fn hot_write_status(&self) -> StoreHotShardsInfos {
        let inner = self.read_inner();
        StoreHotShardsInfos {
            as_leader: inner.st_load_infos[ResourceType::WriteLeader.index()]
                .iter()
                .map(|(&id, d)| (id, d.to_hot_shards_stat()))
                .collect(),
            as_replica: inner.st_load_infos[ResourceType::WriteReplica.index()]
                .iter()
                .map(|(&id, d)| (id, d.to_hot_shards_stat()))
                .collect(),
        }
    }

    pub fn write_pending_influence(&self) -> HashMap<StoreId, Influence> {
        self.copy_pending_influence(ResourceType::WriteReplica)
    }

    pub fn read_pending_influence(&self) -> HashMap<StoreId, Influence> {
        self.copy_pending_influence(ResourceType::ReadLeader)
    }

    fn copy_pending_influence(&self, resource: ResourceType) -> HashMap<StoreId, Influence> {
        self.read_inner().pending_sums[resource.index()].clone()
    }

    /// Drop all pending state (controller reset).
    pub fn clear_pending_influence(&self) {
        let mut inner = self.write_inner();
        inner.tracker.clear();
        inner.pending_sums = Default::default();
    }
}
