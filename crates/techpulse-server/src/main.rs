//! TechPulse server: a continuously running ingestion and analytics engine
//! that aggregates research artifacts from many public sources into one
//! catalog and serves momentum/growth/emerging-technology insights over
//! HTTP.
//!
//! Usage:
//! ```bash
//! # With a config file
//! techpulse-server --config config.yaml
//!
//! # Credentials come from the environment, never the config file
//! OPENAI_API_KEY=sk-... techpulse-server --config config.yaml
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use techpulse_observability::{HealthState, Metrics, TracingConfig, health_router, init_tracing};
use techpulse_scheduler::{AnalyticsRefreshTask, CatalogRefreshTask, Scheduler, SchedulerConfig};
use techpulse_server::config::ServerConfig;
use techpulse_server::{app, bootstrap, routes};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// TechPulse — research-artifact ingestion and analytics engine.
#[derive(Parser)]
#[command(name = "techpulse-server")]
#[command(about = "TechPulse ingestion and analytics server", long_about = None)]
#[command(version = VERSION)]
struct Cli {
    /// Path to a TOML or YAML config file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Run one catalog-refresh cycle immediately at startup instead of
    /// waiting for the first scheduled tick.
    #[arg(long)]
    refresh_on_start: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)?,
        None => ServerConfig::default(),
    };
    config.merge_env();

    init_tracing(TracingConfig {
        default_filter: config.logging.level.clone(),
        json: config.logging.json,
    });

    info!(version = VERSION, "starting TechPulse server");

    // PHASE 1: build every long-lived dependency (Catalog Store, Source
    // Adapters, optional LLM/embedding/transcript clients) from config.
    let bootstrapped = bootstrap::bootstrap(&config).await?;
    info!(adapters = bootstrapped.adapters.len(), store_backend = ?config.store_backend, "bootstrap complete");

    // PHASE 2: application state and the Scheduler that drives it. The
    // catalog/analytics refresh tasks are implemented directly on
    // `AppState`; see app.rs for why the two are wired together after
    // both exist rather than through the constructor.
    let metrics = Arc::new(Metrics::new()?);
    let state = app::AppState::new(bootstrapped, &config, metrics.clone());
    state.refresh_health_snapshot().await;

    let scheduler_config = SchedulerConfig::from_minutes_and_hours(config.refresh_interval_minutes, config.deep_refresh_hours);
    let scheduler = Arc::new(Scheduler::new(scheduler_config, state.clone(), state.clone()));
    state.attach_scheduler(scheduler.clone());

    if cli.refresh_on_start {
        info!("running an initial catalog refresh before serving");
        CatalogRefreshTask::run(state.as_ref(), false).await;
        AnalyticsRefreshTask::run(state.as_ref()).await;
    }

    let cancellation_for_scheduler = state.cancellation.clone();
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(cancellation_for_scheduler).await;
    });

    // PHASE 3: assemble the HTTP surface. `/health`, `/healthz`, and
    // `/metrics` come from techpulse_observability's own router; this
    // binary owns only `/papers/*` and `/insights/*`.
    let health_state = HealthState::new(metrics, state.clone());
    let app = routes::router(state.clone()).merge(health_router(health_state));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("TechPulse listening on http://{addr}");
    info!("  - Papers:   http://{addr}/papers");
    info!("  - Insights: http://{addr}/insights/technologies");
    info!("  - Health:   http://{addr}/health");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state.cancellation.clone()))
        .await?;

    scheduler_handle.abort();
    info!("TechPulse server stopped");

    Ok(())
}

/// Waits for SIGINT or SIGTERM, then cancels `cancellation` so the
/// Scheduler's timer loop and any in-flight ingestion cycle observe it at
/// their next cooperative checkpoint (§5, §B.7).
async fn shutdown_signal(cancellation: techpulse_orchestrator::CancellationToken) {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("shutdown signal received, draining in-flight work");
    cancellation.cancel();
}
