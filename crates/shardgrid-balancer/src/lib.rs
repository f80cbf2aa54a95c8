//! shardgrid-balancer — the hot-shard load balancer.
//!
//! A periodic decision engine that redistributes hot shard replicas (and
//! their leadership) across stores to equalize read and write load. Each
//! tick folds the latest statistics and the influence of still-pending
//! operators into a per-store load prediction, then searches
//! (source store, hot replica, destination store) triples for the move
//! that improves balance most.
//!
//! # Architecture
//!
//! ```text
//! HotShardBalancer
//!   ├── PendingTracker (in-flight operators, decaying weights, GC)
//!   ├── summarize_stores_load (stats + pending influence → LoadPred)
//!   ├── BalanceSolver (src × replica × dst search, progressive rank)
//!   └── SchedulerCounters (skip/success accounting)
//! ScheduleController
//!   └── periodic tokio loop: interval growth, operator hand-off
//! ```
//!
//! The balancer emits at most one operator per tick; the surrounding
//! controller owns cadence and forwards operators to the executor.

pub mod cmp;
pub mod config;
pub mod controller;
pub mod counters;
pub mod kinds;
pub mod load;
pub mod pending;
pub mod scheduler;
pub mod summary;

mod solver;

pub use config::BalancerConfig;
pub use controller::ScheduleController;
pub use counters::CountersSnapshot;
pub use kinds::{OpKind, ResourceType, RwKind, StatKind};
pub use load::{Influence, LoadPred, StoreLoad};
pub use pending::{PendingTracker, ShardPendings};
pub use scheduler::{
    HotShardBalancer, MAX_SCHEDULE_INTERVAL, MIN_SCHEDULE_INTERVAL,
};
pub use summary::{HotShardsStat, StoreHotShardsInfos, StoreLoadDetail};
