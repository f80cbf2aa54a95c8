//! Per-tick store load summaries.
//!
//! Folds raw per-store rates, the hot-replica cache, and the pending
//! influence sums into a `StoreLoadDetail` per store. Rebuilt from
//! scratch each tick.

use std::collections::HashMap;

use serde::Serialize;

use shardgrid_core::{HotReplicaStat, StoreId};

use crate::kinds::{RwKind, StatKind};
use crate::load::{Influence, LoadPred, StoreLoad};

/// A store's load prediction plus the hot replicas backing it.
#[derive(Debug, Clone, Default)]
pub struct StoreLoadDetail {
    pub load_pred: LoadPred,
    pub hot_replicas: Vec<HotReplicaStat>,
}

impl StoreLoadDetail {
    pub fn to_hot_shards_stat(&self) -> HotShardsStat {
        HotShardsStat {
            total_bytes_rate: self.hot_replicas.iter().map(|p| p.byte_rate).sum(),
            total_keys_rate: self.hot_replicas.iter().map(|p| p.key_rate).sum(),
            count: self.hot_replicas.len(),
            stats: self.hot_replicas.clone(),
        }
    }
}

/// Aggregate hot-replica statistics for one store, for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct HotShardsStat {
    pub total_bytes_rate: f64,
    pub total_keys_rate: f64,
    pub count: usize,
    pub stats: Vec<HotReplicaStat>,
}

/// Snapshot of hot-shard state across stores.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreHotShardsInfos {
    pub as_leader: HashMap<StoreId, HotShardsStat>,
    pub as_replica: HashMap<StoreId, HotShardsStat>,
}

/// Drop replicas below the hot-degree threshold, and non-leaders when
/// only leader replicas count.
pub fn filter_hot_replicas(
    kind: StatKind,
    min_hot_degree: u32,
    replicas: &[HotReplicaStat],
) -> Vec<HotReplicaStat> {
    replicas
        .iter()
        .filter(|p| !(kind == StatKind::Leader && !p.is_leader) && p.hot_degree >= min_hot_degree)
        .cloned()
        .collect()
}

/// Build the per-store load details for one resource type.
///
/// Stores absent from `store_byte_rates` have no usable statistics and
/// are dropped — they cannot be scheduled this tick.
pub fn summarize_stores_load(
    store_byte_rates: &HashMap<StoreId, f64>,
    store_key_rates: &HashMap<StoreId, f64>,
    pending_sums: &HashMap<StoreId, Influence>,
    store_hot_replicas: &HashMap<StoreId, Vec<HotReplicaStat>>,
    min_hot_degree: u32,
    rw: RwKind,
    kind: StatKind,
) -> HashMap<StoreId, StoreLoadDetail> {
    let mut detail: HashMap<StoreId, StoreLoadDetail> =
        HashMap::with_capacity(store_byte_rates.len());
    let mut all_byte = 0.0;
    let mut all_key = 0.0;
    let mut all_count = 0.0;

    for (&id, &rate) in store_byte_rates {
        let mut byte_rate = rate;
        let mut key_rate = store_key_rates.get(&id).copied().unwrap_or_default();

        let hot_replicas = filter_hot_replicas(
            kind,
            min_hot_degree,
            store_hot_replicas.get(&id).map_or(&[][..], Vec::as_slice),
        );
        // For write-leader stats only hot-replica contributions are
        // attributable to leaders; the raw store rate mixes in follower
        // apply traffic.
        if kind == StatKind::Leader && rw == RwKind::Write {
            byte_rate = hot_replicas.iter().map(|p| p.byte_rate).sum();
            key_rate = hot_replicas.iter().map(|p| p.key_rate).sum();
        }

        all_byte += byte_rate;
        all_key += key_rate;
        all_count += hot_replicas.len() as f64;

        let load = StoreLoad {
            byte_rate,
            key_rate,
            count: hot_replicas.len() as f64,
        };
        let load_pred = load.to_load_pred(pending_sums.get(&id).copied().unwrap_or_default());

        detail.insert(
            id,
            StoreLoadDetail {
                load_pred,
                hot_replicas,
            },
        );
    }

    let store_count = store_byte_rates.len() as f64;
    let expect = StoreLoad {
        byte_rate: all_byte / store_count,
        key_rate: all_key / store_count,
        count: all_count / store_count,
    };
    for d in detail.values_mut() {
        d.load_pred.expect = expect;
    }

    detail
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(
        shard_id: u64,
        store_id: u64,
        is_leader: bool,
        hot_degree: u32,
        byte_rate: f64,
        key_rate: f64,
    ) -> HotReplicaStat {
        HotReplicaStat {
            shard_id,
            store_id,
            is_leader,
            hot_degree,
            byte_rate,
            key_rate,
        }
    }

    #[test]
    fn filter_drops_cold_and_follower_replicas() {
        let replicas = vec![
            stat(1, 1, true, 5, 100.0, 10.0),
            stat(2, 1, false, 5, 100.0, 10.0),
            stat(3, 1, true, 1, 100.0, 10.0), // below threshold
        ];

        let leaders = filter_hot_replicas(StatKind::Leader, 3, &replicas);
        assert_eq!(leaders.len(), 1);
        assert_eq!(leaders[0].shard_id, 1);

        let all = filter_hot_replicas(StatKind::Replica, 3, &replicas);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn expectation_is_the_mean_of_store_rates() {
        let byte_rates = HashMap::from([(1, 100.0), (2, 10.0), (3, 10.0)]);
        let key_rates = HashMap::from([(1, 50.0), (2, 5.0), (3, 5.0)]);
        let hot = HashMap::from([(1, vec![stat(1, 1, false, 5, 60.0, 30.0)])]);

        let detail = summarize_stores_load(
            &byte_rates,
            &key_rates,
            &HashMap::new(),
            &hot,
            3,
            RwKind::Write,
            StatKind::Replica,
        );

        let expect = detail[&2].load_pred.expect;
        assert_eq!(expect.byte_rate, 40.0);
        assert_eq!(expect.key_rate, 20.0);
        assert!((expect.count - 1.0 / 3.0).abs() < 1e-9);
        // Broadcast into every store's prediction.
        assert_eq!(detail[&1].load_pred.expect, expect);
        assert_eq!(detail[&1].load_pred.current.byte_rate, 100.0);
        assert_eq!(detail[&1].load_pred.current.count, 1.0);
    }

    #[test]
    fn write_leader_rates_come_from_hot_replica_sums() {
        let byte_rates = HashMap::from([(1, 1000.0), (2, 1000.0)]);
        let key_rates = HashMap::from([(1, 100.0), (2, 100.0)]);
        let hot = HashMap::from([
            (1, vec![stat(1, 1, true, 5, 200.0, 20.0)]),
            (2, vec![stat(2, 2, true, 5, 50.0, 5.0)]),
        ]);

        let detail = summarize_stores_load(
            &byte_rates,
            &key_rates,
            &HashMap::new(),
            &hot,
            3,
            RwKind::Write,
            StatKind::Leader,
        );

        // Raw store rates are replaced by leader hot-replica sums, and
        // the expectation is derived from the replaced values.
        assert_eq!(detail[&1].load_pred.current.byte_rate, 200.0);
        assert_eq!(detail[&2].load_pred.current.byte_rate, 50.0);
        assert_eq!(detail[&1].load_pred.expect.byte_rate, 125.0);
        assert_eq!(detail[&1].load_pred.expect.key_rate, 12.5);
    }

    #[test]
    fn read_leader_keeps_raw_store_rates() {
        let byte_rates = HashMap::from([(1, 1000.0)]);
        let key_rates = HashMap::from([(1, 100.0)]);
        let hot = HashMap::from([(1, vec![stat(1, 1, true, 5, 200.0, 20.0)])]);

        let detail = summarize_stores_load(
            &byte_rates,
            &key_rates,
            &HashMap::new(),
            &hot,
            3,
            RwKind::Read,
            StatKind::Leader,
        );

        assert_eq!(detail[&1].load_pred.current.byte_rate, 1000.0);
    }

    #[test]
    fn pending_influence_shapes_the_future_load() {
        let byte_rates = HashMap::from([(1, 100.0), (2, 10.0)]);
        let key_rates = HashMap::from([(1, 10.0), (2, 1.0)]);
        let pendings = HashMap::from([
            (
                1,
                Influence {
                    byte_rate: -60.0,
                    key_rate: -6.0,
                    count: -1.0,
                },
            ),
            (
                2,
                Influence {
                    byte_rate: 60.0,
                    key_rate: 6.0,
                    count: 1.0,
                },
            ),
        ]);

        let detail = summarize_stores_load(
            &byte_rates,
            &key_rates,
            &pendings,
            &HashMap::new(),
            3,
            RwKind::Write,
            StatKind::Replica,
        );

        assert_eq!(detail[&1].load_pred.future.byte_rate, 40.0);
        assert_eq!(detail[&2].load_pred.future.byte_rate, 70.0);
        assert_eq!(detail[&1].load_pred.min().byte_rate, 40.0);
        assert_eq!(detail[&2].load_pred.max().byte_rate, 70.0);
    }

    #[test]
    fn stores_without_byte_rate_are_dropped() {
        let byte_rates = HashMap::from([(1, 100.0)]);
        let key_rates = HashMap::from([(1, 10.0), (2, 99.0)]);

        let detail = summarize_stores_load(
            &byte_rates,
            &key_rates,
            &HashMap::new(),
            &HashMap::new(),
            3,
            RwKind::Read,
            StatKind::Leader,
        );

        assert!(detail.contains_key(&1));
        assert!(!detail.contains_key(&2));
    }

    #[test]
    fn hot_shards_stat_totals_come_from_hot_replicas() {
        let detail = StoreLoadDetail {
            load_pred: LoadPred::default(),
            hot_replicas: vec![
                stat(1, 1, true, 5, 100.0, 10.0),
                stat(2, 1, true, 5, 50.0, 5.0),
            ],
        };

        let stats = detail.to_hot_shards_stat();
        assert_eq!(stats.total_bytes_rate, 150.0);
        assert_eq!(stats.total_keys_rate, 15.0);
        assert_eq!(stats.count, 2);
    }
}
