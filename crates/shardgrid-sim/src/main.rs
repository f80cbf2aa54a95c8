//! shardgrid-sim — drive the hot-shard balancer against a synthetic
//! cluster.
//!
//! Builds a seeded random cluster, runs scheduling ticks, applies each
//! emitted operator immediately (moves succeed instantly), and prints
//! how the per-store write load converges.
//!
//! ```text
//! shardgrid-sim --stores 5 --shards 40 --ticks 60 --seed 42
//! ```

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use shardgrid_balancer::{BalancerConfig, HotShardBalancer, RwKind};
use shardgrid_core::{HotReplicaStat, MemCluster, ShardId, StoreId};
use shardgrid_operator::{OperatorBook, OperatorKind, OperatorStatus};

#[derive(Parser)]
#[command(name = "shardgrid-sim", about = "Hot-shard balancer simulator")]
struct Cli {
    /// Number of stores in the synthetic cluster.
    #[arg(long, default_value = "5")]
    stores: u64,

    /// Number of shards spread across the stores.
    #[arg(long, default_value = "40")]
    shards: u64,

    /// Scheduling ticks to run.
    #[arg(long, default_value = "60")]
    ticks: u32,

    /// RNG seed for both the cluster layout and the balancer.
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Fraction of shards that are write-hot.
    #[arg(long, default_value = "0.15")]
    hot_fraction: f64,
}

/// The simulator's own model of a shard: placement plus a fixed write
/// rate that moves with the replicas.
struct SimShard {
    id: ShardId,
    stores: Vec<StoreId>,
    leader: StoreId,
    byte_rate: f64,
    key_rate: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();
    let cli = Cli::parse();
    anyhow::ensure!(cli.stores >= 2, "need at least two stores");

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let mut shards = build_shards(&cli, &mut rng);

    let conf = BalancerConfig {
        // Instant completion means there is no statistics lag to bridge.
        max_zombie_secs: 0,
        ..Default::default()
    };
    let book = Arc::new(OperatorBook::new());
    let balancer = HotShardBalancer::seeded(conf, book.clone(), cli.seed)
        .with_kinds(vec![RwKind::Write]);

    info!(
        stores = cli.stores,
        shards = cli.shards,
        ticks = cli.ticks,
        "simulation starting"
    );
    print_store_loads("initial", cli.stores, &shards);

    let mut emitted = 0u32;
    for tick in 0..cli.ticks {
        let cluster = materialize(cli.stores, &shards);
        if !balancer.is_schedule_allowed(&cluster) {
            continue;
        }
        for op in balancer.schedule(&cluster) {
            book.register(op.clone());
            let now = Instant::now();
            op.start(now);
            apply_operator(&mut shards, op.shard_id(), op.kind());
            op.finish(OperatorStatus::Success, now);
            emitted += 1;
            info!(tick, shard = op.shard_id(), desc = op.desc(), "applied");
        }
    }

    print_store_loads("final", cli.stores, &shards);
    let counters = balancer.counters();
    info!(
        emitted,
        ticks = counters.schedule,
        skipped = counters.skip,
        "simulation finished"
    );
    Ok(())
}

/// Random placement; a head of hot shards carries most of the load and
/// starts clustered on the low-numbered stores.
fn build_shards(cli: &Cli, rng: &mut StdRng) -> Vec<SimShard> {
    let replicas_per_shard = cli.stores.min(3);
    let hot_count = ((cli.shards as f64) * cli.hot_fraction).ceil() as u64;

    (0..cli.shards)
        .map(|i| {
            let hot = i < hot_count;
            let first = if hot {
                // Pile the hot head onto the first stores.
                i % 2
            } else {
                rng.gen_range(0..cli.stores)
            };
            let stores: Vec<StoreId> = (0..replicas_per_shard)
                .map(|j| ((first + j) % cli.stores) + 1)
                .collect();
            let byte_rate = if hot {
                rng.gen_range(200.0..400.0)
            } else {
                rng.gen_range(1.0..20.0)
            };
            SimShard {
                id: i + 1,
                leader: stores[0],
                stores,
                byte_rate,
                key_rate: byte_rate / 10.0,
            }
        })
        .collect()
}

/// Project the shard table into a cluster view for one tick.
fn materialize(store_count: u64, shards: &[SimShard]) -> MemCluster {
    let mut cluster = MemCluster::new();
    for id in 1..=store_count {
        cluster.add_store(id);
    }
    for shard in shards {
        cluster.add_shard(shard.id, &shard.stores, shard.leader);
        for &store in &shard.stores {
            cluster.add_hot_write(HotReplicaStat {
                shard_id: shard.id,
                store_id: store,
                is_leader: store == shard.leader,
                hot_degree: 5,
                byte_rate: shard.byte_rate,
                key_rate: shard.key_rate,
            });
        }
    }
    for id in 1..=store_count {
        let (bytes, keys) = store_load(id, shards);
        cluster.set_write_rates(id, bytes, keys);
    }
    cluster
}

fn store_load(store: StoreId, shards: &[SimShard]) -> (f64, f64) {
    shards
        .iter()
        .filter(|s| s.stores.contains(&store))
        .fold((0.0, 0.0), |(b, k), s| (b + s.byte_rate, k + s.key_rate))
}

fn apply_operator(shards: &mut [SimShard], shard_id: ShardId, kind: OperatorKind) {
    let Some(shard) = shards.iter_mut().find(|s| s.id == shard_id) else {
        return;
    };
    match kind {
        OperatorKind::MoveReplica { from, to, .. } => {
            if shard.stores.contains(&to) {
                return;
            }
            if let Some(slot) = shard.stores.iter_mut().find(|s| **s == from) {
                *slot = to;
            }
            if shard.leader == from {
                shard.leader = to;
            }
        }
        OperatorKind::TransferLeader { from, to } => {
            if shard.leader == from && shard.stores.contains(&to) {
                shard.leader = to;
            }
        }
    }
}

fn print_store_loads(label: &str, store_count: u64, shards: &[SimShard]) {
    for id in 1..=store_count {
        let (bytes, keys) = store_load(id, shards);
        info!(
            store = id,
            bytes_per_sec = format!("{bytes:.0}"),
            keys_per_sec = format!("{keys:.0}"),
            "{label} load"
        );
    }
}
