//! HTTP JSON interface for the flight game.

pub mod api;

use std::{path::Path, sync::Arc, time::Duration};

use axum::{routing::get, Router};
use chrono::Utc;
use flightgame_core::{GameEngine, SessionStore, StatsStore};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::debug;

/// Shared application state. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub engine: GameEngine,
    pub sessions: Arc<SessionStore>,
    pub stats: Arc<dyn StatsStore>,
    /// Source of goal draws and session ids.
    pub rng: Arc<Mutex<StdRng>>,
}

impl AppState {
    pub fn new(
        engine: GameEngine,
        sessions: Arc<SessionStore>,
        stats: Arc<dyn StatsStore>,
        rng: StdRng,
    ) -> Self {
        Self {
            engine,
            sessions,
            stats,
            rng: Arc::new(Mutex::new(rng)),
        }
    }
}

/// Build the router, optionally serving a static frontend for unmatched paths.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/health", get(api::health))
        .route("/airports", get(api::airports))
        .route("/newgame", get(api::new_game))
        .route("/flyto", get(api::fly_to))
        .route("/game", get(api::current_game))
        .route("/stats", get(api::player_stats));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(
            ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            ),
        )
        .with_state(state)
}

/// Periodically drop idle sessions.
pub fn spawn_session_reaper(sessions: Arc<SessionStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = sessions.purge_expired(Utc::now());
            debug!(purged, live = sessions.len(), "Session sweep finished");
        }
    })
}
