//! Pending-influence tracking.
//!
//! Every emitted operator shifts load from its source to its destination
//! once it completes. Until the statistics catch up, the balancer must
//! account for that shift itself or it will keep re-solving the same
//! imbalance. The tracker records each in-flight operator's influence,
//! weights it by the operator's lifecycle (full weight while running,
//! decaying through a zombie window after success, zero once stale), and
//! folds the weighted sums into per-store deltas each tick.
//!
//! All clock reads arrive as `Instant` parameters; weights are computed
//! lazily at each summarize and never cached.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use shardgrid_core::{ShardId, StoreId};
use shardgrid_operator::{Operator, OperatorStatus};

use crate::kinds::{OpKind, ResourceType};
use crate::load::Influence;

/// One in-flight operator and the load it will shift.
pub struct PendingInfluence {
    pub op: Arc<Operator>,
    pub from: StoreId,
    pub to: StoreId,
    pub influence: Influence,
}

/// The operators a single shard currently has in flight, one slot per
/// action kind.
#[derive(Default)]
pub struct ShardPendings {
    pub move_replica: Option<Arc<Operator>>,
    pub transfer_leader: Option<Arc<Operator>>,
}

impl ShardPendings {
    pub fn get(&self, kind: OpKind) -> Option<&Arc<Operator>> {
        match kind {
            OpKind::MoveReplica => self.move_replica.as_ref(),
            OpKind::TransferLeader => self.transfer_leader.as_ref(),
        }
    }

    fn slot_mut(&mut self, kind: OpKind) -> &mut Option<Arc<Operator>> {
        match kind {
            OpKind::MoveReplica => &mut self.move_replica,
            OpKind::TransferLeader => &mut self.transfer_leader,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.move_replica.is_none() && self.transfer_leader.is_none()
    }
}

pub struct PendingTracker {
    pendings: [Vec<PendingInfluence>; ResourceType::LEN],
    shard_pendings: HashMap<ShardId, ShardPendings>,
    max_zombie: Duration,
}

impl PendingTracker {
    pub fn new(max_zombie: Duration) -> Self {
        Self {
            pendings: Default::default(),
            shard_pendings: HashMap::new(),
            max_zombie,
        }
    }

    /// Record a freshly emitted operator. Refused (returning `false`)
    /// when the shard already has any operator in flight.
    pub fn add(
        &mut self,
        op: Arc<Operator>,
        from: StoreId,
        to: StoreId,
        influence: Influence,
        resource: ResourceType,
        kind: OpKind,
    ) -> bool {
        let shard_id = op.shard_id();
        if self.shard_pendings.contains_key(&shard_id) {
            return false;
        }

        self.pendings[resource.index()].push(PendingInfluence {
            op: op.clone(),
            from,
            to,
            influence,
        });
        *self
            .shard_pendings
            .entry(shard_id)
            .or_default()
            .slot_mut(kind) = Some(op);
        true
    }

    /// Recompute the per-store influence sums for every resource type,
    /// dropping entries whose weight has decayed to zero, then garbage
    /// collect the shard slots.
    pub fn summarize(&mut self, now: Instant) -> [HashMap<StoreId, Influence>; ResourceType::LEN] {
        let mut sums: [HashMap<StoreId, Influence>; ResourceType::LEN] = Default::default();
        for rt in ResourceType::ALL {
            let sum = &mut sums[rt.index()];
            let max_zombie = self.max_zombie;
            self.pendings[rt.index()].retain(|p| {
                let w = pending_weight(&p.op, max_zombie, now);
                if w == 0.0 {
                    return false;
                }
                let to = sum.entry(p.to).or_default();
                *to = to.add(&p.influence, w);
                let from = sum.entry(p.from).or_default();
                *from = from.add(&p.influence, -w);
                true
            });
        }
        self.gc_shard_pendings(now);
        sums
    }

    /// Clear slots whose operator has ended and outlived the zombie
    /// window; drop shard entries once both slots are clear.
    fn gc_shard_pendings(&mut self, now: Instant) {
        let max_zombie = self.max_zombie;
        self.shard_pendings.retain(|_, pendings| {
            for kind in [OpKind::MoveReplica, OpKind::TransferLeader] {
                let slot = pendings.slot_mut(kind);
                if let Some(op) = slot {
                    if op.is_end()
                        && now.saturating_duration_since(op.create_time()) >= max_zombie
                    {
                        *slot = None;
                    }
                }
            }
            !pendings.is_empty()
        });
    }

    /// Shards with any operator still tracked.
    pub fn shard_pendings(&self) -> &HashMap<ShardId, ShardPendings> {
        &self.shard_pendings
    }

    pub fn contains_shard(&self, shard_id: ShardId) -> bool {
        self.shard_pendings.contains_key(&shard_id)
    }

    pub fn clear(&mut self) {
        self.pendings = Default::default();
        self.shard_pendings.clear();
    }

    pub fn weight(&self, op: &Operator, now: Instant) -> f64 {
        pending_weight(op, self.max_zombie, now)
    }
}

/// Weight of one operator's influence, in `[0, 1]`.
///
/// Running operators count in full. A succeeded operator keeps a
/// linearly decaying share through the zombie window, covering the lag
/// until store statistics reflect the completed move. Everything else
/// (expired, timed out, canceled) counts for nothing.
fn pending_weight(op: &Operator, max_zombie: Duration, now: Instant) -> f64 {
    if op.check_expired(now) || op.check_timeout(now) {
        return 0.0;
    }
    let status = op.status();
    if !status.is_end() {
        return 1.0;
    }
    if status != OperatorStatus::Success {
        return 0.0;
    }
    let Some(reached) = op.reach_time_of(OperatorStatus::Success) else {
        return 0.0;
    };
    let zombie = now.saturating_duration_since(reached);
    if zombie >= max_zombie {
        return 0.0;
    }
    (max_zombie - zombie).as_secs_f64() / max_zombie.as_secs_f64()
}
