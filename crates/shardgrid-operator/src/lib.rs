//! shardgrid-operator — scheduled plans and their lifecycle.
//!
//! An `Operator` is a single atomic plan produced by a scheduler: move a
//! replica to another store, or transfer shard leadership. Execution
//! happens elsewhere; this crate owns the entity itself (status machine,
//! create/reach timestamps, expiry and timeout checks), the validating
//! factory, and the `OperatorBook` registry the schedulers consult for
//! concurrency limits.

pub mod book;
pub mod error;
pub mod factory;
pub mod op;

pub use book::OperatorBook;
pub use error::OperatorError;
pub use factory::{create_move_replica_operator, create_transfer_leader_operator};
pub use op::{OpGroup, OpPriority, Operator, OperatorKind, OperatorStatus};
