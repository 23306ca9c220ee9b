//! §4.D step 1: "a periodic planner (every check-interval, enumerate all
//! triggers whose `nextCheckAt ≤ now`)" that fills the work queue the
//! check worker pool drains from.
//!
//! This reference planner has no persisted `nextCheckAt` of its own (the
//! store contract doesn't carry one, see §4.A) — every tick it lists all
//! known triggers, drops the ones outside their evaluation schedule
//! (supplemented feature #5, [`crate::schedule::is_trigger_in_schedule`]),
//! and enqueues the rest. The per-trigger lock (§3, [`crate::lock`]) is
//! what actually prevents a trigger whose previous check is still running
//! from being double-checked; a full queue just means this tick's surplus
//! is dropped and picked up again next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use shared::shutdown::Shutdown;
use shared::store::Store;
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::schedule::is_trigger_in_schedule;

pub struct Planner {
    store: Arc<dyn Store>,
    check_interval: Duration,
}

impl Planner {
    pub fn new(store: Arc<dyn Store>, check_interval: Duration) -> Self {
        Self {
            store,
            check_interval,
        }
    }

    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        queue: mpsc::Sender<shared::types::TriggerId>,
        mut shutdown: Shutdown,
    ) {
        let mut ticker = tokio::time::interval(self.check_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => self.tick(&queue).await,
            }
        }
    }

    async fn tick(&self, queue: &mpsc::Sender<shared::types::TriggerId>) {
        let ids = match self.store.get_all_trigger_ids().await {
            | Ok(ids) => ids,
            | Err(err) => {
                warn!(error = %err, "planner failed to list trigger ids");
                return;
            }
        };
        gauge!("checker.known_triggers_total", ids.len() as f64);

        let now = Utc::now();
        let mut enqueued = 0u64;
        let mut dropped = 0u64;
        for id in ids {
            let trigger = match self.store.get_trigger(&id).await {
                | Ok(t) => t,
                | Err(_) => continue,
            };
            if !is_trigger_in_schedule(&trigger, now) {
                continue;
            }
            match queue.try_send(id.clone()) {
                | Ok(()) => enqueued += 1,
                | Err(mpsc::error::TrySendError::Full(_)) => {
                    dropped += 1;
                }
                | Err(mpsc::error::TrySendError::Closed(_)) => return,
            }
        }
        counter!("checker.triggers_enqueued_total", enqueued);
        if dropped > 0 {
            warn!(
                dropped,
                "check work queue is full, some triggers deferred to next tick"
            );
        }
        trace!(enqueued, dropped, "planner tick complete");
    }
}
