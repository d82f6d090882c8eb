use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

mod api;
mod config;
mod error;
mod schedule;
mod scores;
mod sports;
#[cfg(test)]
mod testing;

use api::AppState;
use config::Config;
use schedule::{Clock, Reconciliation, SeasonSupervisor, SportScheduler, SystemClock};
use scores::{EspnScoreboard, ScoreCache, ScoreFetcher};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let catalog = Arc::new(config.catalog()?);
    info!(
        "Configured sports: {:?} (scoreboards under {})",
        catalog.sports().collect::<Vec<_>>(),
        config.base_url
    );

    let cache = ScoreCache::new();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let fetcher: Arc<dyn ScoreFetcher> = Arc::new(EspnScoreboard::new()?);

    let scheduler = SportScheduler::new(
        &catalog,
        fetcher,
        cache.clone(),
        Arc::clone(&clock),
        config.scheduler_settings(),
    );
    let supervisor = Arc::new(SeasonSupervisor::new(
        &catalog,
        scheduler.clone(),
        Arc::clone(&clock),
    ));

    // Initial pass runs before we accept requests so in-season sports have
    // data (or at least one attempt) by the time the API is up.
    info!("[Schedule] Initializing sports schedule manager...");
    let report = supervisor.reconcile_now().await;
    info!(
        "[Schedule] Initial season check done, polling {:?}",
        scheduler.active_sports()
    );
    if report.iter().all(|(_, r)| *r == Reconciliation::Excluded) {
        warn!("[Schedule] No configured sport can be scheduled");
    }

    let supervisor_task = Arc::clone(&supervisor).spawn(config.season_check_interval());

    let app = api::router(AppState {
        catalog,
        cache,
        scheduler: scheduler.clone(),
        clock,
    });
    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Score API listening on http://{}", addr);

    // Run API server (blocks until shutdown)
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    supervisor_task.abort();
    scheduler.shutdown().await;
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Ctrl+C signal received, shutting down");
}
