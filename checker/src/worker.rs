//! Component D: the check worker pool. Each worker in the pool runs the
//! same loop (§4.D): pull a trigger id, acquire its lock, evaluate, persist,
//! release. Workers are stateless — all shared state lives behind `store`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, histogram};
use shared::metric_source::MetricSource;
use shared::shutdown::Shutdown;
use shared::store::{Store, StoreError};
use shared::types::{CheckData, TriggerId, TtlState};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, instrument, trace, warn};

use crate::error::CheckError;
use crate::evaluator;
use crate::handle_check_result::handle_check_result;
use crate::lock::TriggerLockGuard;

pub struct CheckWorkerPool {
    store: Arc<dyn Store>,
    local_source: Arc<dyn MetricSource>,
    remote_source: Arc<dyn MetricSource>,
    trigger_lock_ttl: Duration,
    metrics_ttl_s: i64,
}

impl CheckWorkerPool {
    pub fn new(
        store: Arc<dyn Store>,
        local_source: Arc<dyn MetricSource>,
        remote_source: Arc<dyn MetricSource>,
        trigger_lock_ttl: Duration,
        metrics_ttl_s: i64,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            local_source,
            remote_source,
            trigger_lock_ttl,
            metrics_ttl_s,
        })
    }

    /// Spawns `worker_count` tasks, all pulling from the same shared
    /// receiver, all observing `shutdown`. Mirrors §5's "Check workers ...
    /// are independent pools; within each pool workers are stateless."
    pub fn spawn_pool(
        self: &Arc<Self>,
        worker_count: usize,
        queue_rx: mpsc::Receiver<TriggerId>,
        shutdown: Shutdown,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        (0..worker_count.max(1))
            .map(|worker_index| {
                let pool = self.clone();
                let queue_rx = queue_rx.clone();
                let mut shutdown = shutdown.clone();
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            _ = shutdown.recv() => break,
                            next = async { queue_rx.lock().await.recv().await } => {
                                match next {
                                    | Some(id) => pool.check_one(worker_index, id).await,
                                    | None => break,
                                }
                            }
                        }
                    }
                    trace!(worker_index, "check worker stopped");
                })
            })
            .collect()
    }

    #[instrument(skip(self), fields(trigger_id = %trigger_id))]
    async fn check_one(&self, worker_index: usize, trigger_id: TriggerId) {
        let start = std::time::Instant::now();
        let lock = match TriggerLockGuard::acquire(
            self.store.clone(),
            trigger_id.clone(),
            self.trigger_lock_ttl,
        )
        .await
        {
            | Ok(guard) => guard,
            | Err(StoreError::BusyLock(_)) => {
                trace!(worker_index, "trigger is being checked by another worker");
                return;
            }
            | Err(err) => {
                warn!(error = %err, "failed to acquire trigger check lock");
                return;
            }
        };

        if let Err(err) = self.run_check(&trigger_id).await {
            counter!("checker.checks_failed_total", 1);
            warn!(error = %err, "check failed for this tick, will retry next tick");
        } else {
            counter!("checker.checks_performed_total", 1);
        }
        histogram!(
            "checker.check_duration_seconds",
            start.elapsed().as_secs_f64()
        );

        drop(lock);
    }

    async fn run_check(&self, trigger_id: &TriggerId) -> Result<(), CheckError> {
        let trigger = self.store.get_trigger(trigger_id).await?;
        let now = Utc::now();
        let prev_check = self
            .store
            .get_trigger_last_check(trigger_id)
            .await?
            .unwrap_or_else(|| CheckData::empty(now));

        let source: &dyn MetricSource = if trigger.is_remote {
            self.remote_source.as_ref()
        } else {
            self.local_source.as_ref()
        };

        let result = evaluator::evaluate(
            source,
            &trigger,
            &prev_check,
            now.timestamp(),
            self.metrics_ttl_s,
        )
        .await;

        let pattern_metrics = match &result {
            | Ok(outcome) => outcome.pattern_metrics.clone(),
            | Err(_) => Vec::new(),
        };

        let outcome =
            handle_check_result(&trigger, &prev_check, now.timestamp(), result);

        // §4.D step 5: persist first, push events second. A crash between
        // the two loses the events but not the state transition — accepted
        // per §9's open question, option (b).
        self.store
            .set_trigger_last_check(trigger_id, &outcome.check, trigger.is_remote)
            .await?;

        for event in outcome.events {
            let is_trigger_event = event.is_trigger_event;
            if let Err(err) = self
                .store
                .push_notification_event(event, is_trigger_event)
                .await
            {
                warn!(error = %err, "failed to push notification event, it will not be re-emitted");
            }
        }

        // §4.D step 6: bound source storage, and reap fully-deleted
        // triggers' patterns once `ttlState=DEL` has emptied `metrics`.
        if !pattern_metrics.is_empty() {
            let until = now.timestamp() - self.metrics_ttl_s;
            if let Err(err) =
                self.store.remove_metrics_values(&pattern_metrics, until).await
            {
                warn!(error = %err, "failed to compact metric storage");
            }
        }
        if trigger.ttl_state == TtlState::Del && outcome.check.metrics.is_empty() {
            if let Err(err) =
                self.store.remove_patterns_metrics(&trigger.patterns).await
            {
                warn!(error = %err, "failed to remove patterns metrics on DEL cleanup");
            }
        }

        Ok(())
    }
}
