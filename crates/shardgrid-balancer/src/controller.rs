//! Periodic schedule driver.
//!
//! Owns the balancer's cadence: ticks at `min_interval`, backs off
//! exponentially while ticks come back empty, and snaps back to the
//! floor as soon as an operator is produced. Emitted operators are
//! registered with the `OperatorBook` and handed to the executor over an
//! mpsc channel; execution itself happens elsewhere.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use shardgrid_core::ClusterView;
use shardgrid_operator::{Operator, OperatorBook};

use crate::scheduler::HotShardBalancer;

pub struct ScheduleController {
    balancer: Arc<HotShardBalancer>,
    book: Arc<OperatorBook>,
}

impl ScheduleController {
    pub fn new(balancer: Arc<HotShardBalancer>, book: Arc<OperatorBook>) -> Self {
        Self { balancer, book }
    }

    /// Run the schedule loop until the shutdown signal flips.
    pub async fn run(
        &self,
        cluster: Arc<dyn ClusterView + Send + Sync>,
        ops_tx: mpsc::Sender<Arc<Operator>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut interval = self.balancer.min_interval();
        info!(
            interval_secs = interval.as_secs(),
            "hot-shard schedule loop started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    if !self.balancer.is_schedule_allowed(cluster.as_ref()) {
                        debug!("schedule limits reached, waiting");
                        continue;
                    }

                    let ops = self.balancer.schedule(cluster.as_ref());
                    if ops.is_empty() {
                        interval = self.balancer.next_interval(interval);
                        continue;
                    }

                    for op in ops {
                        self.book.register(op.clone());
                        if ops_tx.send(op).await.is_err() {
                            warn!("executor channel closed, stopping schedule loop");
                            return;
                        }
                    }
                    interval = self.balancer.min_interval();
                }
                _ = shutdown.changed() => {
                    info!("hot-shard schedule loop shutting down");
                    break;
                }
            }
        }
    }
}
