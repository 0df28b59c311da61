use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use flightgame_core::{
    config::{self, AppConfig},
    directory::load_directory,
    GameEngine, JsonStatsStore, SessionStore,
};
use flightgame_server::{create_router, spawn_session_reaper, AppState};
use rand::{rngs::StdRng, SeedableRng};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    if let Err(err) = config::ensure_default_config() {
        warn!("Could not write default config: {err:#}");
    }
    let config = AppConfig::load()?;

    let directory = load_directory(config.airports_path.as_deref(), config.filter.clone())?;
    info!(airports = directory.len(), "Airport directory loaded");

    let engine = GameEngine::new(Arc::new(directory), config.rules.clone());
    let sessions = Arc::new(SessionStore::new(config.session_ttl()));
    let stats = Arc::new(JsonStatsStore::new(config.stats_path.clone()));
    let state = AppState::new(engine, sessions.clone(), stats, StdRng::from_entropy());

    spawn_session_reaper(sessions, REAPER_INTERVAL);

    let static_dir = config.static_dir.as_deref().filter(|dir| dir.is_dir());
    if let Some(dir) = static_dir {
        info!(dir = %dir.display(), "Serving static frontend");
    }
    let app = create_router(state, static_dir);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server stopped");
    Ok(())
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("flightgame_server=info,flightgame_core=info,tower_http=debug")
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .compact()
                .with_writer(std::io::stdout),
        )
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
