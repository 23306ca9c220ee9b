//! Component H (§4.H): every `interval`, compare the inbound metrics
//! counter to its previous sample; write a liveness beacon to the store
//! only when it moved. Matches the original's
//! `internal/filter/heartbeat.Worker` — self-checking by absence of
//! ingestion progress rather than a plain "I'm alive" ping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared::shutdown::Shutdown;
use shared::store::Store;
use tracing::{debug, warn};

pub struct Heartbeat {
    store: Arc<dyn Store>,
    interval: Duration,
    inbound_metrics: Arc<AtomicU64>,
}

impl Heartbeat {
    pub fn new(
        store: Arc<dyn Store>,
        interval: Duration,
        inbound_metrics: Arc<AtomicU64>,
    ) -> Self {
        Self {
            store,
            interval,
            inbound_metrics,
        }
    }

    pub async fn run(&self, mut shutdown: Shutdown) {
        let mut ticker = tokio::time::interval(self.interval);
        let mut last_count = self.inbound_metrics.load(Ordering::Relaxed);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    let count = self.inbound_metrics.load(Ordering::Relaxed);
                    if count != last_count {
                        debug!(from = last_count, to = count, "heartbeat updated");
                        match self.store.update_metrics_heartbeat().await {
                            | Ok(()) => last_count = count,
                            | Err(err) => warn!(error = %err, "save heartbeat state failed"),
                        }
                    }
                }
            }
        }
    }
}
