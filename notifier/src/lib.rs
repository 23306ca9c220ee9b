//! The notifier crate: component E (scheduler), F (event-fetch worker pool)
//! and G (dispatch worker), plus the sender capability trait they dispatch
//! through. See SPEC_FULL.md's module-by-module carry forward table for the
//! full component-to-module map.

pub mod dispatch;
pub mod error;
pub mod event_fetch;
pub mod resend;
pub mod scheduler;
pub mod sender;

use std::sync::Arc;
use std::time::Duration;

use shared::service::ServiceContext;
use shared::shutdown::Shutdown;
use shared::store::Store;
use tokio::task::JoinSet;
use tracing::info;

use dispatch::DispatchWorker;
use event_fetch::EventFetchWorker;
use sender::Sender;

/// Starts `event_fetch_worker_count` event-fetch workers plus the dispatch
/// worker (and its per-sender channel tasks), all wired through `store` and
/// `senders`. Runs until `context`'s shutdown signal fires, then waits for
/// in-flight work to drain.
#[tracing::instrument(skip_all, fields(service = context.service_name()))]
pub async fn start_notifier(
    mut context: ServiceContext,
    store: Arc<dyn Store>,
    senders: Vec<Arc<dyn Sender>>,
) {
    let config = context.load_config();
    let shutdown = context.shutdown_handle();

    let (dispatch_worker, sender_tasks) = DispatchWorker::new(
        store.clone(),
        senders,
        config.notifier.default_contact_channel_capacity,
        Duration::from_millis(config.notifier.dispatch_tick_interval_ms),
        Duration::from_secs(config.notifier.sending_timeout_s),
        config.notifier.resending_timeout_s,
    );

    let mut tasks = JoinSet::new();
    {
        let dispatch_shutdown = shutdown.clone();
        // Spawn on a clone, keeping `dispatch_worker` itself alive in this
        // scope so we control exactly when its `channels` map (and the
        // sender-side `mpsc::Sender`s it holds) gets dropped, below.
        let dispatch_worker = dispatch_worker.clone();
        tasks.spawn(async move { dispatch_worker.run(dispatch_shutdown).await });
    }
    for worker_index in 0..config.notifier.event_fetch_worker_count.max(1) {
        let worker = EventFetchWorker::new(store.clone());
        let worker_shutdown: Shutdown = shutdown.clone();
        tasks.spawn(async move {
            tracing::trace!(worker_index, "event fetch worker started");
            worker.run(worker_shutdown).await;
        });
    }

    context.recv_shutdown_signal().await;
    info!("notifier received shutdown signal, draining in-flight work");
    while tasks.join_next().await.is_some() {}
    // Drop this crate's last `Arc<DispatchWorker>` so its `channels` map is
    // freed and every sender-loop task observes its channel close and exits.
    drop(dispatch_worker);
    for handle in sender_tasks {
        let _ = handle.await;
    }
    info!("notifier stopped");
}
