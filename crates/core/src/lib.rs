#![warn(clippy::all, missing_docs)]

//! Core domain logic for the airport-hopping flight game.
//!
//! This crate hosts the airport directory, geodesic arithmetic, the
//! travel-budget game engine, session and statistics storage, and the
//! configuration shared by the HTTP server and the terminal client.

pub mod config;
pub mod directory;
pub mod error;
pub mod game;
pub mod geo;
pub mod models;
pub mod save;
pub mod session;
pub mod stats;

pub use config::AppConfig;
pub use directory::{AirportDirectory, DirectoryFilter, StaticDirectory};
pub use error::{GameError, GameResult};
pub use game::{
    Difficulty, FailurePolicy, FlightReport, GameEngine, GameRules, GameState, NewGame, Outcome,
};
pub use models::{Airport, AirportKind, RankedAirport};
pub use session::{SessionId, SessionStore};
pub use stats::{JsonStatsStore, PlayerStats, StatsStore};
