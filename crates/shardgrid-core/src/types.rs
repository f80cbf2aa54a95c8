//! Domain types for the shardgrid cluster.
//!
//! A *store* is a storage node; a *shard* is a contiguous key range
//! replicated across stores. Each shard has exactly one leader replica;
//! the rest are followers (voters or learners).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a store (storage node).
pub type StoreId = u64;

/// Unique identifier for a shard (replicated key range).
pub type ShardId = u64;

// ── Store ─────────────────────────────────────────────────────────

/// Lifecycle state of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreState {
    Up,
    Offline,
    Tombstone,
}

/// Description of a store as seen by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDesc {
    pub id: StoreId,
    pub state: StoreState,
    /// Heartbeats have stopped arriving.
    pub disconnected: bool,
    /// The store reported itself busy (e.g. applying snapshots).
    pub busy: bool,
    /// Arbitrary labels for scheduling constraints.
    pub labels: HashMap<String, String>,
}

impl StoreDesc {
    /// A healthy, unlabeled store in the `Up` state.
    pub fn new(id: StoreId) -> Self {
        Self {
            id,
            state: StoreState::Up,
            disconnected: false,
            busy: false,
            labels: HashMap::new(),
        }
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    fn is_schedulable(&self) -> bool {
        self.state == StoreState::Up && !self.disconnected && !self.busy
    }

    /// Whether this store may receive a new replica.
    pub fn allows_inbound_replica(&self) -> bool {
        self.is_schedulable()
    }

    /// Whether this store may be handed shard leadership.
    pub fn allows_leader(&self) -> bool {
        self.is_schedulable() && self.label(crate::filter::LABEL_REJECT_LEADER) != Some("true")
    }
}

// ── Shard ─────────────────────────────────────────────────────────

/// Voting status of a replica within its shard's raft group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicaRole {
    Voter,
    Learner,
}

/// One replica of a shard on a particular store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    pub store_id: StoreId,
    pub role: ReplicaRole,
}

/// Description of a shard: its replicas and current leader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardDesc {
    pub id: ShardId,
    pub replicas: Vec<Replica>,
    /// Store currently holding the leader replica.
    pub leader: StoreId,
}

impl ShardDesc {
    pub fn replica_on(&self, store_id: StoreId) -> Option<&Replica> {
        self.replicas.iter().find(|r| r.store_id == store_id)
    }

    pub fn voter_on(&self, store_id: StoreId) -> Option<&Replica> {
        self.replicas
            .iter()
            .find(|r| r.store_id == store_id && r.role == ReplicaRole::Voter)
    }

    /// Ids of all stores currently holding a replica of this shard.
    pub fn store_ids(&self) -> Vec<StoreId> {
        self.replicas.iter().map(|r| r.store_id).collect()
    }

    /// Ids of stores holding a non-leader replica.
    pub fn followers(&self) -> Vec<StoreId> {
        self.replicas
            .iter()
            .filter(|r| r.store_id != self.leader)
            .map(|r| r.store_id)
            .collect()
    }
}

// ── Statistics ────────────────────────────────────────────────────

/// Observed load of a single shard replica, reported by store heartbeats.
///
/// A replica only enters the hot cache once its rate has stayed above the
/// threshold for several reporting rounds; `hot_degree` counts those
/// rounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotReplicaStat {
    pub shard_id: ShardId,
    pub store_id: StoreId,
    pub is_leader: bool,
    pub hot_degree: u32,
    pub byte_rate: f64,
    pub key_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_on(stores: &[StoreId], leader: StoreId) -> ShardDesc {
        ShardDesc {
            id: 1,
            replicas: stores
                .iter()
                .map(|&store_id| Replica {
                    store_id,
                    role: ReplicaRole::Voter,
                })
                .collect(),
            leader,
        }
    }

    #[test]
    fn shard_lookup_helpers() {
        let shard = shard_on(&[1, 2, 3], 1);

        assert!(shard.replica_on(2).is_some());
        assert!(shard.replica_on(4).is_none());
        assert_eq!(shard.store_ids(), vec![1, 2, 3]);
        assert_eq!(shard.followers(), vec![2, 3]);
    }

    #[test]
    fn learner_is_not_a_voter() {
        let mut shard = shard_on(&[1, 2], 1);
        shard.replicas[1].role = ReplicaRole::Learner;

        assert!(shard.replica_on(2).is_some());
        assert!(shard.voter_on(2).is_none());
        assert!(shard.voter_on(1).is_some());
    }

    #[test]
    fn store_state_gates_scheduling() {
        let mut store = StoreDesc::new(1);
        assert!(store.allows_inbound_replica());
        assert!(store.allows_leader());

        store.busy = true;
        assert!(!store.allows_inbound_replica());

        store.busy = false;
        store.state = StoreState::Offline;
        assert!(!store.allows_inbound_replica());
        assert!(!store.allows_leader());
    }

    #[test]
    fn reject_leader_label_blocks_leadership_only() {
        let mut store = StoreDesc::new(1);
        store
            .labels
            .insert("reject-leader".to_string(), "true".to_string());

        assert!(store.allows_inbound_replica());
        assert!(!store.allows_leader());
    }
}
