//! The operator entity.
//!
//! Operators are shared between the scheduler that produced them (which
//! tracks their pending influence) and the executor that drives them, so
//! the status lives behind interior mutability and the entity is handed
//! around as `Arc<Operator>`. All clock reads flow in as `Instant`
//! parameters so callers (and tests) control time.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use shardgrid_core::{ReplicaRole, ShardId, StoreId};

/// An operator still in `Created` after this long is expired: the
/// executor never picked it up.
pub const OPERATOR_EXPIRE_AFTER: Duration = Duration::from_secs(3);

/// Running time budget for a replica move (snapshot transfer included).
pub const MOVE_REPLICA_TIMEOUT: Duration = Duration::from_secs(600);

/// Running time budget for a leadership transfer.
pub const TRANSFER_LEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// What the operator does once executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    MoveReplica {
        from: StoreId,
        to: StoreId,
        role: ReplicaRole,
    },
    TransferLeader {
        from: StoreId,
        to: StoreId,
    },
}

/// Lifecycle status. `Created` and `Started` are live; the rest are end
/// statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorStatus {
    Created,
    Started,
    Success,
    Canceled,
    Expired,
    Timeout,
}

impl OperatorStatus {
    pub fn is_end(self) -> bool {
        matches!(
            self,
            OperatorStatus::Success
                | OperatorStatus::Canceled
                | OperatorStatus::Expired
                | OperatorStatus::Timeout
        )
    }
}

/// Execution priority relative to other pending operators. Every
/// hot-shard operator carries `High`; executors dispatch it ahead of
/// routine maintenance work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpPriority {
    High,
}

/// Scheduling groups used for concurrency accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpGroup {
    /// Produced by hot-shard balancing.
    HotShard,
    /// Transfers shard leadership.
    Leader,
    /// Moves replica data.
    Shard,
}

struct OperatorState {
    status: OperatorStatus,
    reached: Vec<(OperatorStatus, Instant)>,
}

pub struct Operator {
    desc: String,
    shard_id: ShardId,
    kind: OperatorKind,
    priority: OpPriority,
    groups: Vec<OpGroup>,
    created_at: Instant,
    state: Mutex<OperatorState>,
}

impl Operator {
    pub fn new(
        desc: impl Into<String>,
        shard_id: ShardId,
        kind: OperatorKind,
        groups: Vec<OpGroup>,
        now: Instant,
    ) -> Self {
        Self {
            desc: desc.into(),
            shard_id,
            kind,
            priority: OpPriority::High,
            groups,
            created_at: now,
            state: Mutex::new(OperatorState {
                status: OperatorStatus::Created,
                reached: vec![(OperatorStatus::Created, now)],
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, OperatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn desc(&self) -> &str {
        &self.desc
    }

    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }

    pub fn kind(&self) -> OperatorKind {
        self.kind
    }

    pub fn priority(&self) -> OpPriority {
        self.priority
    }

    pub fn in_group(&self, group: OpGroup) -> bool {
        self.groups.contains(&group)
    }

    pub fn create_time(&self) -> Instant {
        self.created_at
    }

    pub fn status(&self) -> OperatorStatus {
        self.state().status
    }

    pub fn is_end(&self) -> bool {
        self.status().is_end()
    }

    /// When the operator first reached `status`, if it ever did.
    pub fn reach_time_of(&self, status: OperatorStatus) -> Option<Instant> {
        self.state()
            .reached
            .iter()
            .find(|(s, _)| *s == status)
            .map(|&(_, at)| at)
    }

    /// Mark the operator picked up by the executor.
    pub fn start(&self, now: Instant) {
        let mut state = self.state();
        if state.status == OperatorStatus::Created {
            state.status = OperatorStatus::Started;
            state.reached.push((OperatorStatus::Started, now));
        }
    }

    /// Transition to an end status. Ignored if already ended, or if the
    /// given status is not an end status.
    pub fn finish(&self, status: OperatorStatus, now: Instant) {
        if !status.is_end() {
            return;
        }
        let mut state = self.state();
        if state.status.is_end() {
            return;
        }
        state.status = status;
        state.reached.push((status, now));
    }

    /// Expire the operator if the executor never started it in time.
    /// Returns whether the operator is (now) expired.
    pub fn check_expired(&self, now: Instant) -> bool {
        let mut state = self.state();
        match state.status {
            OperatorStatus::Expired => true,
            OperatorStatus::Created
                if now.saturating_duration_since(self.created_at) >= OPERATOR_EXPIRE_AFTER =>
            {
                state.status = OperatorStatus::Expired;
                state.reached.push((OperatorStatus::Expired, now));
                true
            }
            _ => false,
        }
    }

    /// Time the operator out if it has been running past its budget.
    /// Returns whether the operator is (now) timed out.
    pub fn check_timeout(&self, now: Instant) -> bool {
        let budget = match self.kind {
            OperatorKind::MoveReplica { .. } => MOVE_REPLICA_TIMEOUT,
            OperatorKind::TransferLeader { .. } => TRANSFER_LEADER_TIMEOUT,
        };
        let mut state = self.state();
        match state.status {
            OperatorStatus::Timeout => true,
            OperatorStatus::Started => {
                let started = state
                    .reached
                    .iter()
                    .find(|(s, _)| *s == OperatorStatus::Started)
                    .map(|&(_, at)| at)
                    .unwrap_or(self.created_at);
                if now.saturating_duration_since(started) >= budget {
                    state.status = OperatorStatus::Timeout;
                    state.reached.push((OperatorStatus::Timeout, now));
                    true
                } else {
                    false
                }
            }
            _ => false,
        }
    }
}

impl std::fmt::Debug for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operator")
            .field("desc", &self.desc)
            .field("shard_id", &self.shard_id)
            .field("kind", &self.kind)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn move_op(now: Instant) -> Operator {
        Operator::new(
            "move-hot-write-replica",
            10,
            OperatorKind::MoveReplica {
                from: 1,
                to: 2,
                role: ReplicaRole::Voter,
            },
            vec![OpGroup::HotShard, OpGroup::Shard],
            now,
        )
    }

    #[test]
    fn lifecycle_records_reach_times() {
        let t0 = Instant::now();
        let op = move_op(t0);

        assert_eq!(op.status(), OperatorStatus::Created);
        assert_eq!(op.priority(), OpPriority::High);
        assert_eq!(op.reach_time_of(OperatorStatus::Created), Some(t0));

        let t1 = t0 + Duration::from_secs(1);
        op.start(t1);
        assert_eq!(op.status(), OperatorStatus::Started);

        let t2 = t0 + Duration::from_secs(2);
        op.finish(OperatorStatus::Success, t2);
        assert!(op.is_end());
        assert_eq!(op.reach_time_of(OperatorStatus::Success), Some(t2));
    }

    #[test]
    fn finish_is_latched() {
        let t0 = Instant::now();
        let op = move_op(t0);

        op.finish(OperatorStatus::Success, t0);
        op.finish(OperatorStatus::Canceled, t0 + Duration::from_secs(1));

        assert_eq!(op.status(), OperatorStatus::Success);
    }

    #[test]
    fn finish_rejects_live_statuses() {
        let t0 = Instant::now();
        let op = move_op(t0);

        op.finish(OperatorStatus::Started, t0);
        assert_eq!(op.status(), OperatorStatus::Created);
    }

    #[test]
    fn unstarted_operator_expires() {
        let t0 = Instant::now();
        let op = move_op(t0);

        assert!(!op.check_expired(t0 + Duration::from_secs(2)));
        assert!(op.check_expired(t0 + Duration::from_secs(4)));
        assert_eq!(op.status(), OperatorStatus::Expired);
        // Stays expired on re-check.
        assert!(op.check_expired(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn started_operator_does_not_expire() {
        let t0 = Instant::now();
        let op = move_op(t0);
        op.start(t0 + Duration::from_secs(1));

        assert!(!op.check_expired(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn timeout_budget_depends_on_kind() {
        let t0 = Instant::now();
        let mv = move_op(t0);
        mv.start(t0);
        assert!(!mv.check_timeout(t0 + Duration::from_secs(599)));
        assert!(mv.check_timeout(t0 + Duration::from_secs(600)));

        let tl = Operator::new(
            "transfer-hot-read-leader",
            11,
            OperatorKind::TransferLeader { from: 1, to: 2 },
            vec![OpGroup::HotShard, OpGroup::Leader],
            t0,
        );
        tl.start(t0);
        assert!(!tl.check_timeout(t0 + Duration::from_secs(9)));
        assert!(tl.check_timeout(t0 + Duration::from_secs(10)));
    }
}
