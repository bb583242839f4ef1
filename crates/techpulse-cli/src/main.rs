//! `techpulse` — the operator CLI: trigger a manual catalog refresh,
//! print a catalog/health snapshot, or validate a config file, all
//! without starting the long-running server (§B.7). Thin over the same
//! `techpulse-server` library the server binary runs.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use techpulse_observability::{HealthSnapshot, Metrics, TracingConfig, init_tracing};
use techpulse_scheduler::{AnalyticsRefreshTask, CatalogRefreshTask};
use techpulse_server::app::AppState;
use techpulse_server::bootstrap;
use techpulse_server::config::ServerConfig;

#[derive(Parser)]
#[command(name = "techpulse")]
#[command(about = "TechPulse operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one catalog-refresh cycle (and a deep analytics refresh) then exit.
    Refresh {
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Resets the expanding-window threshold to 7 days (§6).
        #[arg(long)]
        force: bool,
    },
    /// Print the current catalog size, watermarks, and cached analytics summary.
    Status {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Load a config file and report whether it parses and what it resolves to.
    Config {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn load_config(path: &Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_file(path).map_err(|e| anyhow::anyhow!("{e}"))?,
        None => ServerConfig::default(),
    };
    config.merge_env();
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh { config, force } => run_refresh(config, force).await,
        Commands::Status { config } => run_status(config).await,
        Commands::Config { config } => run_config_check(config),
    }
}

async fn run_refresh(config_path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;
    init_tracing(TracingConfig {
        default_filter: config.logging.level.clone(),
        json: config.logging.json,
    });

    let bootstrapped = bootstrap::bootstrap(&config).await?;
    info!(adapters = bootstrapped.adapters.len(), "bootstrap complete");

    let metrics = std::sync::Arc::new(Metrics::new()?);
    let state = AppState::new(bootstrapped, &config, metrics);

    CatalogRefreshTask::run(state.as_ref(), force).await;
    AnalyticsRefreshTask::run(state.as_ref()).await;

    println!("refresh complete: {} records in catalog", state.cache_size());
    Ok(())
}

async fn run_status(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(&config_path)?;
    init_tracing(TracingConfig {
        default_filter: config.logging.level.clone(),
        json: config.logging.json,
    });

    let bootstrapped = bootstrap::bootstrap(&config).await?;
    let metrics = std::sync::Arc::new(Metrics::new()?);
    let state = AppState::new(bootstrapped, &config, metrics);
    state.refresh_health_snapshot().await;

    println!("catalog size:      {}", state.cache_size());
    match state.last_fetch_time() {
        Some(t) => println!("last fetch time:   {t}"),
        None => println!("last fetch time:   never"),
    }

    match state.analytics_snapshot().await {
        Some(snapshot) => {
            println!("analytics snapshot generated at {} (window {} days)", snapshot.generated_at, snapshot.window_days);
            println!("  momentum entries:   {}", snapshot.momentum.len());
            println!("  growth entries:     {}", snapshot.growth.len());
            println!("  emerging entries:   {}", snapshot.emerging.len());
            println!("  predictions:        {}", snapshot.predictions.len());
        }
        None => println!("analytics snapshot: none computed yet"),
    }

    Ok(())
}

fn run_config_check(config_path: PathBuf) -> anyhow::Result<()> {
    let mut config = ServerConfig::from_file(&config_path).map_err(|e| anyhow::anyhow!("{e}"))?;
    config.merge_env();
    println!("{} parses cleanly. Resolved configuration:", config_path.display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
