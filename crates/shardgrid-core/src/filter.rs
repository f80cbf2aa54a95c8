//! Store filters — hard constraints on destination candidates.
//!
//! Filters reject stores; they never rank them. Ranking is the balance
//! solver's job.

use std::collections::HashSet;

use crate::types::{StoreDesc, StoreId};

/// Label key marking a store as reserved for a dedicated use.
pub const LABEL_RESERVED_USE: &str = "reserved-use";

/// Reservation value for stores dedicated to absorbing hot shards.
pub const RESERVED_USE_HOT_SHARD: &str = "hot-shard";

/// Label key marking a store that must not hold shard leadership.
pub const LABEL_REJECT_LEADER: &str = "reject-leader";

/// What the scheduler intends to do on the candidate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    MoveReplica,
    TransferLeader,
}

/// A hard constraint on destination stores.
pub trait StoreFilter {
    fn accepts(&self, store: &StoreDesc) -> bool;
}

/// Rejects stores whose state cannot take the intended action.
pub struct StoreStateFilter {
    pub action: FilterAction,
}

impl StoreFilter for StoreStateFilter {
    fn accepts(&self, store: &StoreDesc) -> bool {
        match self.action {
            FilterAction::MoveReplica => store.allows_inbound_replica(),
            FilterAction::TransferLeader => store.allows_leader(),
        }
    }
}

/// Rejects an explicit set of stores (e.g. stores already holding a
/// replica of the shard being moved).
pub struct ExcludedFilter {
    excluded: HashSet<StoreId>,
}

impl ExcludedFilter {
    pub fn new(excluded: impl IntoIterator<Item = StoreId>) -> Self {
        Self {
            excluded: excluded.into_iter().collect(),
        }
    }
}

impl StoreFilter for ExcludedFilter {
    fn accepts(&self, store: &StoreDesc) -> bool {
        !self.excluded.contains(&store.id)
    }
}

/// Rejects stores reserved for a use other than hot-shard scheduling.
pub struct ReservedUseFilter;

impl StoreFilter for ReservedUseFilter {
    fn accepts(&self, store: &StoreDesc) -> bool {
        match store.label(LABEL_RESERVED_USE) {
            None => true,
            Some(value) => value == RESERVED_USE_HOT_SHARD,
        }
    }
}

/// A store is a valid target only if every filter accepts it.
pub fn accepts_all(filters: &[Box<dyn StoreFilter>], store: &StoreDesc) -> bool {
    filters.iter().all(|f| f.accepts(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_filter_distinguishes_actions() {
        let mut store = StoreDesc::new(1);
        store
            .labels
            .insert(LABEL_REJECT_LEADER.to_string(), "true".to_string());

        let move_filter = StoreStateFilter {
            action: FilterAction::MoveReplica,
        };
        let leader_filter = StoreStateFilter {
            action: FilterAction::TransferLeader,
        };

        assert!(move_filter.accepts(&store));
        assert!(!leader_filter.accepts(&store));
    }

    #[test]
    fn excluded_filter_rejects_members() {
        let filter = ExcludedFilter::new([1, 2]);

        assert!(!filter.accepts(&StoreDesc::new(1)));
        assert!(filter.accepts(&StoreDesc::new(3)));
    }

    #[test]
    fn reserved_use_allows_hot_shard_reservation() {
        let filter = ReservedUseFilter;

        let plain = StoreDesc::new(1);
        assert!(filter.accepts(&plain));

        let mut reserved_for_us = StoreDesc::new(2);
        reserved_for_us.labels.insert(
            LABEL_RESERVED_USE.to_string(),
            RESERVED_USE_HOT_SHARD.to_string(),
        );
        assert!(filter.accepts(&reserved_for_us));

        let mut reserved_other = StoreDesc::new(3);
        reserved_other
            .labels
            .insert(LABEL_RESERVED_USE.to_string(), "backup".to_string());
        assert!(!filter.accepts(&reserved_other));
    }

    #[test]
    fn accepts_all_short_circuits_on_any_rejection() {
        let filters: Vec<Box<dyn StoreFilter>> = vec![
            Box::new(StoreStateFilter {
                action: FilterAction::MoveReplica,
            }),
            Box::new(ExcludedFilter::new([7])),
        ];

        assert!(accepts_all(&filters, &StoreDesc::new(1)));
        assert!(!accepts_all(&filters, &StoreDesc::new(7)));
    }
}
