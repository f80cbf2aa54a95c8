//! The scheduling type lexicon.
//!
//! Balancing happens along two axes — which flow is hot (read or write)
//! and which action rebalances it (move a replica or transfer leadership).
//! Load accounting collapses the four combinations into three resource
//! types, because both read actions draw on the same leader-side
//! statistics.

use std::fmt;

/// Which flow a balance pass looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RwKind {
    Write,
    Read,
}

impl RwKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RwKind::Write => "write",
            RwKind::Read => "read",
        }
    }
}

impl fmt::Display for RwKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which action a balance pass may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    MoveReplica,
    TransferLeader,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::MoveReplica => "move-replica",
            OpKind::TransferLeader => "transfer-leader",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which replicas on a store contribute to its load summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatKind {
    /// Only leader replicas count.
    Leader,
    /// Every replica counts.
    Replica,
}

/// The load-accounting class of a `(RwKind, OpKind)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    WriteReplica,
    WriteLeader,
    ReadLeader,
}

impl ResourceType {
    pub const LEN: usize = 3;

    pub const ALL: [ResourceType; Self::LEN] = [
        ResourceType::WriteReplica,
        ResourceType::WriteLeader,
        ResourceType::ReadLeader,
    ];

    /// Total mapping from the scheduling axes. Reads always balance
    /// against leader-side statistics, whichever action is taken.
    pub fn of(rw: RwKind, op: OpKind) -> Self {
        match (rw, op) {
            (RwKind::Write, OpKind::MoveReplica) => ResourceType::WriteReplica,
            (RwKind::Write, OpKind::TransferLeader) => ResourceType::WriteLeader,
            (RwKind::Read, _) => ResourceType::ReadLeader,
        }
    }

    pub fn index(self) -> usize {
        match self {
            ResourceType::WriteReplica => 0,
            ResourceType::WriteLeader => 1,
            ResourceType::ReadLeader => 2,
        }
    }

    /// Which replicas feed this resource's load summary.
    pub fn stat_kind(self) -> StatKind {
        match self {
            ResourceType::WriteReplica => StatKind::Replica,
            ResourceType::WriteLeader | ResourceType::ReadLeader => StatKind::Leader,
        }
    }
}
