//! Operator construction errors.

use shardgrid_core::{ShardId, StoreId};
use thiserror::Error;

/// Why the factory refused to build an operator.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error("shard {shard} has no replica on source store {store}")]
    NoReplicaOnSource { shard: ShardId, store: StoreId },

    #[error("shard {shard} already has a replica on destination store {store}")]
    ReplicaExists { shard: ShardId, store: StoreId },

    #[error("store {store} is not the leader of shard {shard}")]
    NotLeader { shard: ShardId, store: StoreId },

    #[error("store {store} holds no voter replica of shard {shard}")]
    NotVoter { shard: ShardId, store: StoreId },
}
