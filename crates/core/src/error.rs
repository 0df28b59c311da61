//! Error taxonomy shared by every frontend.

use thiserror::Error;

/// Errors raised by game operations. Each one is scoped to a single request
/// and leaves the player's state untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    /// A required input was absent or empty.
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    /// A parameter was present but could not be interpreted.
    #[error("invalid value '{value}' for parameter '{name}'")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Raw value supplied by the caller.
        value: String,
    },

    /// Unknown airport identifier.
    #[error("airport '{0}' not found")]
    NotFound(String),

    /// The requested hop exceeds the remaining time or distance.
    #[error(
        "not enough budget: hop needs {required_distance:.1} km / {required_time:.1} min, \
         {remaining_distance:.1} km / {remaining_time:.1} min left"
    )]
    InsufficientBudget {
        /// Distance of the rejected hop in kilometres.
        required_distance: f64,
        /// Flight time of the rejected hop in minutes.
        required_time: f64,
        /// Distance budget at the time of the request.
        remaining_distance: f64,
        /// Time budget at the time of the request.
        remaining_time: f64,
    },

    /// No live session matches the supplied identifier.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// No airport other than the start can be drawn as a goal.
    #[error("no goal airports available from '{0}'")]
    NoGoalCandidates(String),

    /// The game already ended in victory.
    #[error("game already finished")]
    GameFinished,
}

/// Convenience alias for game operations.
pub type GameResult<T> = Result<T, GameError>;
