//! The checker crate: component C (the pure evaluator), component D (the
//! check worker pool plus its lock, planner and schedule gate), and
//! component H (heartbeat). See SPEC_FULL.md's module-by-module carry
//! forward table for the full component-to-module map.

pub mod error;
pub mod evaluator;
pub mod expression;
pub mod handle_check_result;
pub mod heartbeat;
pub mod lock;
pub mod planner;
pub mod schedule;
pub mod worker;

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use shared::metric_source::local::LocalMetricSource;
use shared::metric_source::remote::RemoteMetricSource;
use shared::metric_source::MetricSource;
use shared::service::ServiceContext;
use shared::store::Store;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::info;

use heartbeat::Heartbeat;
use planner::Planner;
use worker::CheckWorkerPool;

/// Starts the planner, the check worker pool, and the heartbeat, wired
/// through `store`. Runs until `context`'s shutdown signal fires, then
/// waits for in-flight checks to drain (§5: "each component exposes
/// `Stop()` that signals shutdown and waits for in-flight work to drain").
#[tracing::instrument(skip_all, fields(service = context.service_name()))]
pub async fn start_checker(
    mut context: ServiceContext,
    store: Arc<dyn Store>,
    local_source: Arc<dyn MetricSource>,
) {
    let config = context.load_config();
    let shutdown = context.shutdown_handle();

    let remote_source: Arc<dyn MetricSource> =
        match &config.checker.remote_metric_source_url {
            | Some(url) => Arc::new(RemoteMetricSource::new(
                url.clone(),
                Duration::from_secs(config.checker.remote_request_timeout_s),
            )),
            | None => local_source.clone(),
        };

    let pool = CheckWorkerPool::new(
        store.clone(),
        local_source,
        remote_source,
        Duration::from_secs(config.checker.trigger_lock_ttl_s),
        config.checker.metrics_ttl_s,
    );

    let (queue_tx, queue_rx) = mpsc::channel(config.checker.max_triggers_per_tick);
    let worker_handles =
        pool.spawn_pool(config.checker.worker_pool_size, queue_rx, shutdown.clone());

    let planner = Planner::new(store, Duration::from_secs(config.checker.check_interval_s));

    let mut tasks = JoinSet::new();
    tasks.spawn(async move { planner.run(queue_tx, shutdown.clone()).await });

    context.recv_shutdown_signal().await;
    info!("checker received shutdown signal, draining in-flight checks");
    while tasks.join_next().await.is_some() {}
    for handle in worker_handles {
        let _ = handle.await;
    }
    info!("checker stopped");
}

/// Component H standalone, for deployments that run the heartbeat as its
/// own role (`Role::Heartbeat`) rather than folded into the check worker
/// pool. The counter it watches has no driver in this workspace — it is
/// only ever incremented by the out-of-scope metric-ingestion path (§1);
/// here it simply stays at zero, so this role only demonstrates the no
/// -progress-detected branch until wired to a real ingestion pipeline.
#[tracing::instrument(skip_all, fields(service = context.service_name()))]
pub async fn start_heartbeat(mut context: ServiceContext, store: Arc<dyn Store>) {
    let config = context.load_config();
    let shutdown = context.shutdown_handle();
    let heartbeat = Heartbeat::new(
        store,
        Duration::from_secs(config.heartbeat.interval_s),
        Arc::new(AtomicU64::new(0)),
    );

    let mut tasks = JoinSet::new();
    tasks.spawn(async move { heartbeat.run(shutdown).await });

    context.recv_shutdown_signal().await;
    info!("heartbeat received shutdown signal");
    while tasks.join_next().await.is_some() {}
    info!("heartbeat stopped");
}

/// Builds a [`LocalMetricSource`] with no seeded series — production
/// deployments seed it through whatever ingests metric samples; tests seed
/// it directly via `LocalMetricSource::seed`.
pub fn empty_local_source() -> Arc<LocalMetricSource> {
    Arc::new(LocalMetricSource::new())
}
