//! Validating constructors for the two operator kinds.
//!
//! The factory re-checks the cluster facts an operator depends on; a
//! scheduler working from stale statistics gets an error back instead of
//! an unexecutable plan.

use std::time::Instant;

use shardgrid_core::{ShardDesc, StoreId};

use crate::error::OperatorError;
use crate::op::{OpGroup, Operator, OperatorKind};

/// Build an operator that moves the shard's replica from `from` to `to`,
/// preserving the replica's role.
pub fn create_move_replica_operator(
    desc: impl Into<String>,
    shard: &ShardDesc,
    from: StoreId,
    to: StoreId,
    base_group: OpGroup,
    now: Instant,
) -> Result<Operator, OperatorError> {
    let replica = shard
        .replica_on(from)
        .ok_or(OperatorError::NoReplicaOnSource {
            shard: shard.id,
            store: from,
        })?;
    if shard.replica_on(to).is_some() {
        return Err(OperatorError::ReplicaExists {
            shard: shard.id,
            store: to,
        });
    }

    Ok(Operator::new(
        desc,
        shard.id,
        OperatorKind::MoveReplica {
            from,
            to,
            role: replica.role,
        },
        vec![base_group, OpGroup::Shard],
        now,
    ))
}

/// Build an operator that transfers the shard's leadership from `from`
/// to `to`. The destination must hold a voter replica.
pub fn create_transfer_leader_operator(
    desc: impl Into<String>,
    shard: &ShardDesc,
    from: StoreId,
    to: StoreId,
    base_group: OpGroup,
    now: Instant,
) -> Result<Operator, OperatorError> {
    if shard.leader != from {
        return Err(OperatorError::NotLeader {
            shard: shard.id,
            store: from,
        });
    }
    if shard.voter_on(to).is_none() {
        return Err(OperatorError::NotVoter {
            shard: shard.id,
            store: to,
        });
    }

    Ok(Operator::new(
        desc,
        shard.id,
        OperatorKind::TransferLeader { from, to },
        vec![base_group, OpGroup::Leader],
        now,
    ))
}
