//! Balancer configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BalancerConfig {
    /// A store qualifies as a source only if its optimistic load exceeds
    /// `ratio × expectation` on both byte and key rate.
    pub src_tolerance_ratio: f64,
    /// A store qualifies as a destination only if its pessimistic load
    /// times this ratio stays below expectation on both rates.
    pub dst_tolerance_ratio: f64,
    /// Decline ratio at or below which a move counts as a strong
    /// improvement.
    pub great_dec_ratio: f64,
    /// Looser decline ratio meaning "byte rate not worsened".
    pub minor_dec_ratio: f64,
    /// Fraction of the cluster-wide max byte rate used as one rank step.
    pub byte_rank_step_ratio: f64,
    /// Fraction of the cluster-wide max key rate used as one rank step.
    pub key_rank_step_ratio: f64,
    /// Fraction of the cluster-wide max hot count used as one rank step.
    pub count_rank_step_ratio: f64,
    /// Cap on hot replicas explored per source store per tick.
    pub max_replica_count: usize,
    /// How long a succeeded operator keeps exerting (decaying) influence;
    /// also the GC cutoff for its pending record.
    pub max_zombie_secs: u64,
    /// Minimum key rate for a replica to count as key-hot in ranking.
    pub min_hot_key_rate: f64,
    /// Minimum byte rate for a replica to count as byte-hot in ranking.
    pub min_hot_byte_rate: f64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            src_tolerance_ratio: 1.05,
            dst_tolerance_ratio: 1.05,
            great_dec_ratio: 0.95,
            minor_dec_ratio: 0.99,
            byte_rank_step_ratio: 0.05,
            key_rank_step_ratio: 0.05,
            count_rank_step_ratio: 0.01,
            max_replica_count: 1000,
            max_zombie_secs: 30,
            min_hot_key_rate: 10.0,
            min_hot_byte_rate: 100.0,
        }
    }
}

impl BalancerConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BalancerConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.src_tolerance_ratio >= 1.0,
            "src_tolerance_ratio must be >= 1.0, got {}",
            self.src_tolerance_ratio
        );
        anyhow::ensure!(
            self.dst_tolerance_ratio >= 1.0,
            "dst_tolerance_ratio must be >= 1.0, got {}",
            self.dst_tolerance_ratio
        );
        anyhow::ensure!(
            self.great_dec_ratio < 1.0,
            "great_dec_ratio must be < 1.0, got {}",
            self.great_dec_ratio
        );
        anyhow::ensure!(
            self.minor_dec_ratio >= self.great_dec_ratio,
            "minor_dec_ratio must be >= great_dec_ratio"
        );
        anyhow::ensure!(
            self.max_replica_count >= 1,
            "max_replica_count must be >= 1"
        );
        anyhow::ensure!(
            self.byte_rank_step_ratio >= 0.0
                && self.key_rank_step_ratio >= 0.0
                && self.count_rank_step_ratio >= 0.0,
            "rank step ratios must be non-negative"
        );
        Ok(())
    }

    pub fn max_zombie_duration(&self) -> Duration {
        Duration::from_secs(self.max_zombie_secs)
    }
}
