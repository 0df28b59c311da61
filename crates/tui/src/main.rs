mod app;

use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use anyhow::Result;
use flightgame_core::{
    config::{self, AppConfig},
    directory::load_directory,
    save::SaveManager,
    GameEngine, JsonStatsStore,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;

    let directory = load_directory(config.airports_path.as_deref(), config.filter.clone())?;
    info!(airports = directory.len(), "Airport directory loaded");

    let engine = GameEngine::new(Arc::new(directory), config.rules.clone());
    let stats = Arc::new(JsonStatsStore::new(config.stats_path.clone()));
    let saves = SaveManager::new(config.save_dir.clone());

    let mut app = app::FlightApp::new(engine, stats, saves, StdRng::from_entropy());
    app.run().await
}

/// Log to `logs/flightgame.log` only; stdout belongs to the terminal UI.
fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("flightgame.log"))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("flightgame=info,flightgame_core=info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
