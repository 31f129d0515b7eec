use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod config;
mod controller;
mod dashboard;
mod db;
mod pipeline;
mod publish;
mod sources;

use config::Config;
use controller::Controller;
use dashboard::DashboardState;
use db::SnapshotStore;
use pipeline::{Aggregator, Randomness, RefreshPolicy};
use publish::{AppState, Publisher, Renderer, TracingRenderer};
use sources::{adapter_chain, Fetch, HttpFetcher};

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

    let store = SnapshotStore::open(&config.database_path)?;
    info!("Snapshot store opened: {}", config.database_path);

    let rng = Arc::new(match config.rng_seed {
        Some(seed) => {
            info!("Using deterministic RNG seed {}", seed);
            Randomness::seeded(seed)
        }
        None => Randomness::from_entropy(),
    });

    let fetch: Arc<dyn Fetch> = Arc::new(HttpFetcher::new(config.relays(), config.http_timeout())?);
    let adapters = adapter_chain(
        fetch,
        store.clone(),
        rng.clone(),
        config.tournament_year,
        !config.disable_hardcoded,
    )?;
    info!("Configured {} source adapter(s)", adapters.len());

    let aggregator = Aggregator::new(
        adapters,
        store,
        RefreshPolicy::new(config.refresh_interval()),
        rng.clone(),
        config.adapter_timeout(),
    );
    let state = Arc::new(AppState::new());
    let renderers: Vec<Arc<dyn Renderer>> = vec![Arc::new(TracingRenderer)];
    let publisher = Publisher::new(state.clone(), renderers, rng);
    let controller = Arc::new(Controller::new(aggregator, publisher));

    let report = if config.force_refresh {
        info!("Force refresh requested");
        controller.force_cycle().await?
    } else {
        controller.run_cycle().await
    };
    match &report.source {
        Some(source) => info!(
            "Refresh complete from {} ({} teams, {} fixtures{})",
            source,
            report.teams,
            report.fixtures,
            if report.served_from_cache { ", cached" } else { "" }
        ),
        None => info!("Refresh produced no data; stored snapshot left untouched"),
    }

    if !config.serve {
        return Ok(());
    }

    controller.clone().spawn_refresh_loop(config.refresh_interval());

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout())
        .build()?;
    let app = dashboard::router(DashboardState {
        app: state,
        controller,
        http,
    });
    let addr: SocketAddr = config.dashboard_addr.parse()?;
    info!("Dashboard listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Run dashboard server (blocks until shutdown)
    axum::serve(listener, app).await?;

    Ok(())
}
