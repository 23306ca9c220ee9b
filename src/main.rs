mod cli;
mod metric_defs;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use cli::LogFormat;
use colored::Colorize;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_util::MetricKindMask;
use shared::config::{ConfigLoader, Role};
use shared::netutils::parse_addr;
use shared::service::ServiceContext;
use shared::shutdown::Shutdown;
use shared::store::memory::InMemoryStore;
use shared::store::Store;
use tokio::task::JoinSet;
use tokio::{select, time};
use tracing::{debug, error, info, trace, warn, Subscriber};
use tracing_subscriber::FmtSubscriber;

fn setup_logging_subscriber(f: &LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "alertengined=debug,checker=debug,notifier=debug".into());

    let sub = FmtSubscriber::builder()
        .with_thread_names(true)
        .with_max_level(tracing::Level::INFO)
        .with_env_filter(env_filter);

    match f {
        | cli::LogFormat::Pretty => Box::new(sub.pretty().finish()),
        | cli::LogFormat::Compact => Box::new(sub.compact().finish()),
        | cli::LogFormat::Json => Box::new(sub.json().finish()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = cli::CliOpts::parse();
    let mut shutdown = Shutdown::default();

    tracing::subscriber::set_global_default(setup_logging_subscriber(&opts.log_format))?;

    debug!("** {} **", "alertengined".magenta());
    trace!(config = opts.config, "loading configuration");
    let config_loader = Arc::new(ConfigLoader::from_path(&opts.config));
    let config = config_loader.load()?;

    let prometheus_sockaddr =
        parse_addr(&config.main.prometheus_address, config.main.prometheus_port)?;
    let builder = PrometheusBuilder::new();
    info!("Prometheus HTTP listener on {:?}", prometheus_sockaddr);
    builder
        .idle_timeout(MetricKindMask::HISTOGRAM, Some(Duration::from_secs(120)))
        .with_http_listener(prometheus_sockaddr)
        .install()
        .expect("failed to install Prometheus recorder");
    metric_defs::install_metrics();

    // The persistence backend (§1, out of scope) is injected as a `dyn
    // Store`; this binary wires up the in-memory reference implementation
    // since no production-grade backend crate lives in this workspace. A
    // real deployment swaps this for a Redis-backed (or similar) `Store`.
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let local_source = checker::empty_local_source();

    let mut services = JoinSet::new();
    for role in config.main.roles.iter().copied() {
        services.spawn(spawn_service(
            role,
            config_loader.clone(),
            shutdown.clone(),
            store.clone(),
            local_source.clone(),
        ));
    }

    select! {
        _ = shutdown.recv() => {
            warn!("received shutdown signal from downstream services!");
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("received Ctrl+c signal (SIGINT)!");
            shutdown.broadcast_shutdown();
        }
    };

    info!("waiting (10s) for services to shutdown cleanly...");
    if (time::timeout(Duration::from_secs(10), async {
        while services.join_next().await.is_some() {
            info!("need to wait for {} services to terminate", services.len());
        }
    })
    .await)
        .is_err()
    {
        error!(
            "timed out awaiting {} services to shutdown!",
            services.len()
        );
        services.shutdown().await;
        bail!("some services were not terminated cleanly!");
    }
    info!("bye!");

    Ok(())
}

async fn spawn_service(
    role: Role,
    config_loader: Arc<ConfigLoader>,
    shutdown: Shutdown,
    store: Arc<dyn Store>,
    local_source: Arc<shared::metric_source::local::LocalMetricSource>,
) {
    let service_name = format!("{role:?}");
    info!(service = service_name, "starting service '{service_name}'");

    let context = ServiceContext::new(service_name.clone(), config_loader, shutdown);

    match role {
        | Role::Checker => checker::start_checker(context, store, local_source).await,
        | Role::Notifier => {
            let timeout = Duration::from_secs(context.load_config().notifier.sending_timeout_s);
            let senders: Vec<Arc<dyn notifier::sender::Sender>> =
                vec![Arc::new(notifier::sender::WebhookSender::new(timeout))];
            notifier::start_notifier(context, store, senders).await
        }
        | Role::Heartbeat => checker::start_heartbeat(context, store).await,
    }
    info!("service '{service_name}' terminated");
}
