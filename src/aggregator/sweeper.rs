//! Periodic eviction of idle transaction buckets.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time;

use crate::aggregator::store::{AggregatorStore, BUCKET_TTL};
use crate::observability::metrics;

/// Time between sweeps. Equal to the TTL, so an idle bucket lives between one
/// and two intervals.
pub const SWEEP_INTERVAL: Duration = BUCKET_TTL;

/// Walks the store on a fixed interval and deletes idle buckets.
pub struct Sweeper {
    store: Arc<AggregatorStore>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<AggregatorStore>) -> Self {
        Self {
            store,
            interval: SWEEP_INTERVAL,
        }
    }

    /// Override the tick interval. The TTL itself is fixed.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run a single sweep. Returns the number of evicted buckets.
    pub fn sweep(&self) -> usize {
        let evicted = self.store.evict_stale();
        let remaining = self.store.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining, "Evicted idle transaction buckets");
        }
        metrics::record_evictions(evicted);
        metrics::record_active_buckets(remaining);
        evicted
    }

    /// Spawn the sweep loop on the current runtime.
    ///
    /// The loop ends on [`SweeperHandle::stop`] or when `shutdown` fires.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> SweeperHandle {
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(stop_rx, shutdown));
        SweeperHandle {
            stop_tx: Some(stop_tx),
            task,
        }
    }

    async fn run(self, mut stop: oneshot::Receiver<()>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            ttl_secs = self.store.ttl().as_secs(),
            "Bucket sweeper starting"
        );

        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep();
                }
                _ = &mut stop => {
                    tracing::info!("Bucket sweeper stopped");
                    break;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Bucket sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Cancel handle for a running [`Sweeper`].
pub struct SweeperHandle {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the loop and wait for it to exit.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!(error = %e, "Bucket sweeper task ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if self.stop_tx.is_some() {
            self.task.abort();
        }
    }
}
