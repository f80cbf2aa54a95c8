//! Registry of in-flight operators.
//!
//! Schedulers consult the book to respect concurrency limits before
//! producing more work. Ended operators fall out of the counts lazily.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::op::{OpGroup, Operator};

#[derive(Default)]
pub struct OperatorBook {
    ops: Mutex<Vec<Arc<Operator>>>,
}

impl OperatorBook {
    pub fn new() -> Self {
        Self::default()
    }

    fn ops(&self) -> MutexGuard<'_, Vec<Arc<Operator>>> {
        self.ops.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn register(&self, op: Arc<Operator>) {
        self.ops().push(op);
    }

    /// Live operators in the given group. Ended operators are pruned.
    pub fn operator_count(&self, group: OpGroup) -> u64 {
        let mut ops = self.ops();
        ops.retain(|op| !op.is_end());
        ops.iter().filter(|op| op.in_group(group)).count() as u64
    }

    /// All operators still live, in registration order.
    pub fn live(&self) -> Vec<Arc<Operator>> {
        let mut ops = self.ops();
        ops.retain(|op| !op.is_end());
        ops.clone()
    }

    pub fn clear(&self) {
        self.ops().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{OperatorKind, OperatorStatus};
    use shardgrid_core::ReplicaRole;
    use std::time::Instant;

    fn register_pair(book: &OperatorBook) -> (Arc<Operator>, Arc<Operator>) {
        let now = Instant::now();
        let mv = Arc::new(Operator::new(
            "move-hot-write-replica",
            10,
            OperatorKind::MoveReplica {
                from: 1,
                to: 2,
                role: ReplicaRole::Voter,
            },
            vec![OpGroup::HotShard, OpGroup::Shard],
            now,
        ));
        let tl = Arc::new(Operator::new(
            "transfer-hot-read-leader",
            11,
            OperatorKind::TransferLeader { from: 1, to: 3 },
            vec![OpGroup::HotShard, OpGroup::Leader],
            now,
        ));
        book.register(mv.clone());
        book.register(tl.clone());
        (mv, tl)
    }

    #[test]
    fn counts_by_group() {
        let book = OperatorBook::new();
        let _ops = register_pair(&book);

        assert_eq!(book.operator_count(OpGroup::HotShard), 2);
        assert_eq!(book.operator_count(OpGroup::Leader), 1);
        assert_eq!(book.operator_count(OpGroup::Shard), 1);
    }

    #[test]
    fn ended_operators_are_pruned() {
        let book = OperatorBook::new();
        let (mv, _tl) = register_pair(&book);

        mv.finish(OperatorStatus::Success, Instant::now());

        assert_eq!(book.operator_count(OpGroup::HotShard), 1);
        assert_eq!(book.operator_count(OpGroup::Shard), 0);
        assert_eq!(book.live().len(), 1);
    }
}
