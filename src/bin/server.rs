//! `vplan-server`: scrape, cache, and serve the substitution plan.
//!
//! Takes an optional config-file path as its single argument; without
//! one it uses `~/.config/vplan/config.toml`, writing a starter file
//! there on first run.

use std::sync::Arc;
use std::time::Duration;

use vplan::config::AppConfig;
use vplan::query::PlanService;
use vplan::rate_limit::FetchGate;
use vplan::refresh::RefreshJob;
use vplan::retry::RetrySchedule;
use vplan::scrape::PlanFetcher;
use vplan::store::PlanStore;
use vplan::web::PlanServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config()?;
    config.validate()?;

    let store = PlanStore::open(&config.store.data_dir)?;
    let gate = Arc::new(FetchGate::new(Duration::from_millis(
        config.source.min_request_interval_ms,
    )));
    let fetcher = PlanFetcher::new(&config.source, gate)?;
    let retry = RetrySchedule::from_config(&config.retry);

    let service = PlanService::new(store.clone(), fetcher.clone(), retry);
    let refresh = RefreshJob::new(store, fetcher, retry, config.calendar.clone());

    let jobs = refresh.start(&config.refresh);
    let server = PlanServer::start(service, config.calendar.clone(), &config.server).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.shutdown();
    jobs.shutdown();
    Ok(())
}

/// Resolve the config: explicit path argument, else the default path
/// (seeded with defaults on first run), else plain defaults.
fn load_config() -> anyhow::Result<AppConfig> {
    if let Some(arg) = std::env::args().nth(1) {
        let path = std::path::PathBuf::from(arg);
        let config = AppConfig::from_file(&path)?;
        tracing::info!("loaded config from {}", path.display());
        return Ok(config);
    }

    let path = AppConfig::default_config_path();
    if path.exists() {
        let config = AppConfig::from_file(&path)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    } else {
        let config = AppConfig::default();
        config.save_to_file(&path)?;
        tracing::info!("wrote starter config to {}", path.display());
        Ok(config)
    }
}
