//! Request handlers and wire types.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use flightgame_core::{
    stats::record_outcome, Airport, Difficulty, FlightReport, GameError, GameState, Outcome,
    PlayerStats, RankedAirport, SessionId, StatsStore,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;

/// Failure surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug)]
pub enum ApiError {
    /// Domain error scoped to the request.
    Game(GameError),
    /// Lookup of a record that does not exist.
    NoRecord(String),
    /// Unexpected infrastructure failure.
    Internal(anyhow::Error),
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError::Game(err)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Game(err) => {
                let status = match &err {
                    GameError::MissingParameter(_)
                    | GameError::InvalidParameter { .. }
                    | GameError::InsufficientBudget { .. } => StatusCode::BAD_REQUEST,
                    GameError::NotFound(_) | GameError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                    GameError::GameFinished => StatusCode::CONFLICT,
                    GameError::NoGoalCandidates(_) => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.to_string())
            }
            ApiError::NoRecord(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Internal(err) => {
                error!("Request failed: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Game state as returned by `/newgame`, `/flyto` and `/game`.
#[derive(Debug, Serialize)]
pub struct GameView {
    pub session: String,
    pub name: String,
    pub remaining_time: f64,
    pub remaining_distance: f64,
    pub current_location: String,
    pub visited_airports: Vec<String>,
    pub goal_airports: Vec<String>,
    pub difficulty: Difficulty,
    pub locations: Vec<RankedAirport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Outcome>,
    /// Length of the hop just flown. Absent when the hop was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Flight time of the hop just flown. Absent when the hop was refused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flight_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl GameView {
    fn new(session: SessionId, state: &GameState, locations: Vec<RankedAirport>) -> Self {
        Self {
            session: session.to_string(),
            name: state.player_name.clone(),
            remaining_time: state.remaining_time,
            remaining_distance: state.remaining_distance,
            current_location: state.current_airport.clone(),
            visited_airports: state.visited_airports.clone(),
            goal_airports: state.goal_airports.clone(),
            difficulty: state.difficulty,
            locations,
            status: None,
            distance: None,
            flight_time: None,
            message: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct NewGameQuery {
    player: Option<String>,
    loc: Option<String>,
    difficulty: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FlyToQuery {
    session: Option<String>,
    dest: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    player: Option<String>,
}

fn required(value: Option<String>, name: &'static str) -> Result<String, GameError> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(GameError::MissingParameter(name))
}

fn session_id(value: Option<String>) -> Result<SessionId, GameError> {
    required(value, "session")?.parse()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn airports(State(state): State<AppState>) -> Json<Vec<Airport>> {
    Json(state.engine.directory().eligible())
}

pub async fn new_game(
    State(state): State<AppState>,
    Query(query): Query<NewGameQuery>,
) -> ApiResult<GameView> {
    let player = required(query.player, "player")?;
    let loc = required(query.loc, "loc")?;
    let difficulty = query
        .difficulty
        .as_deref()
        .map(|value| value.parse::<Difficulty>())
        .transpose()?
        .unwrap_or_default();

    let (game, id) = {
        let mut rng = state.rng.lock();
        let game = state.engine.start_game(&player, &loc, difficulty, &mut *rng)?;
        let id = state.sessions.create(game.state.clone(), &mut *rng);
        (game, id)
    };
    info!(session = %id, player = %game.state.player_name, "New game");

    Ok(Json(GameView::new(id, &game.state, game.locations)))
}

pub async fn fly_to(
    State(state): State<AppState>,
    Query(query): Query<FlyToQuery>,
) -> ApiResult<GameView> {
    let id = session_id(query.session)?;
    let dest = required(query.dest, "dest")?;

    let (report, game) = state.sessions.update(&id, |game| {
        let report = state.engine.fly_to(game, &dest)?;
        Ok((report, game.clone()))
    })?;
    if report.outcome != Outcome::Continue {
        persist_outcome(state.stats.clone(), game.clone(), report.clone()).await;
    }

    let message = match report.outcome {
        Outcome::Victory => {
            state.sessions.remove(&id);
            Some("Congratulations! You reached every goal airport.".to_string())
        }
        Outcome::Stranded => {
            state.sessions.remove(&id);
            Some("No airport is within your remaining budget. Game over.".to_string())
        }
        Outcome::GoalReached => Some(format!("Goal reached: {}", report.destination)),
        Outcome::Restart => Some("Out of time or distance. The game starts over.".to_string()),
        Outcome::Continue => None,
    };

    let mut view = GameView::new(id, &game, report.locations);
    view.status = Some(report.outcome);
    if report.flown {
        view.distance = Some(report.distance);
        view.flight_time = Some(report.flight_time);
    }
    view.message = message;
    Ok(Json(view))
}

/// Stats live in a JSON file; write them off the async workers.
async fn persist_outcome(stats: Arc<dyn StatsStore>, game: GameState, report: FlightReport) {
    let task = tokio::task::spawn_blocking(move || record_outcome(stats.as_ref(), &game, &report));
    if let Err(err) = task.await {
        error!("Stats task failed: {err}");
    }
}

pub async fn current_game(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> ApiResult<GameView> {
    let id = session_id(query.session)?;
    let snapshot = state.sessions.get(&id)?;
    let locations = state.engine.locations(&snapshot.state)?;
    Ok(Json(GameView::new(id, &snapshot.state, locations)))
}

pub async fn player_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<PlayerStats> {
    let player = required(query.player, "player")?;
    let stats = state.stats.clone();
    let lookup = player.clone();
    let record = tokio::task::spawn_blocking(move || stats.get(&lookup))
        .await
        .map_err(|err| ApiError::Internal(err.into()))??;
    match record {
        Some(stats) => Ok(Json(stats)),
        None => Err(ApiError::NoRecord(format!(
            "no statistics recorded for '{player}'"
        ))),
    }
}
