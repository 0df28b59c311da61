//! Travel-budget game rules and state transitions.

mod engine;
pub mod ranking;
mod rules;
mod state;

pub use engine::{FlightReport, GameEngine, NewGame};
pub use ranking::{has_reachable_destination, rank_nearest, reachable_destinations};
pub use rules::{Budget, Difficulty, FailurePolicy, GameRules, DEFAULT_GOAL_POOL};
pub use state::{GameState, GameStatus, Outcome};
