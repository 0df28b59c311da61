#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use super::rules::{Budget, Difficulty};

/// Lifecycle of a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    /// Moves are accepted.
    #[default]
    Active,
    /// Every goal was reached.
    Won,
    /// No airport is within the remaining budget.
    Lost,
}

/// Classification of a completed move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Ordinary hop.
    Continue,
    /// A goal was reached and others remain.
    #[serde(rename = "goal")]
    GoalReached,
    /// The last goal was reached.
    Victory,
    /// The hop did not fit the budget and the game was reset.
    Restart,
    /// Nothing is reachable any more and the game is lost.
    #[serde(rename = "game_over")]
    Stranded,
}

impl Outcome {
    /// Wire label (`continue`, `goal`, `victory`, `restart`, `game_over`).
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Continue => "continue",
            Outcome::GoalReached => "goal",
            Outcome::Victory => "victory",
            Outcome::Restart => "restart",
            Outcome::Stranded => "game_over",
        }
    }
}

/// Per-player game state. Mutated only through
/// [`GameEngine`](super::GameEngine) operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub player_name: String,
    pub start_airport: String,
    /// Always the last element of `visited_airports`.
    pub current_airport: String,
    pub visited_airports: Vec<String>,
    pub remaining_time: f64,
    pub remaining_distance: f64,
    /// Goals still to reach.
    pub goal_airports: Vec<String>,
    /// Goals drawn at game start, restored on restart.
    pub initial_goals: Vec<String>,
    pub difficulty: Difficulty,
    pub starting_budget: Budget,
    #[serde(default)]
    pub status: GameStatus,
}

impl GameState {
    pub(crate) fn new(
        player_name: String,
        start_airport: String,
        goals: Vec<String>,
        difficulty: Difficulty,
        budget: Budget,
    ) -> Self {
        Self {
            player_name,
            current_airport: start_airport.clone(),
            visited_airports: vec![start_airport.clone()],
            start_airport,
            remaining_time: budget.time,
            remaining_distance: budget.distance,
            goal_airports: goals.clone(),
            initial_goals: goals,
            difficulty,
            starting_budget: budget,
            status: GameStatus::Active,
        }
    }

    /// Remaining allowance.
    pub fn budget(&self) -> Budget {
        Budget {
            time: self.remaining_time,
            distance: self.remaining_distance,
        }
    }

    /// Minutes spent since the start (or last restart).
    pub fn time_used(&self) -> f64 {
        self.starting_budget.time - self.remaining_time
    }

    /// Kilometres flown since the start (or last restart).
    pub fn distance_used(&self) -> f64 {
        self.starting_budget.distance - self.remaining_distance
    }

    /// Number of hops taken.
    pub fn hops(&self) -> usize {
        self.visited_airports.len().saturating_sub(1)
    }

    /// True once the game was won or lost.
    pub fn is_finished(&self) -> bool {
        self.status != GameStatus::Active
    }

    pub fn is_goal(&self, ident: &str) -> bool {
        self.goal_airports.iter().any(|goal| goal == ident)
    }

    pub fn has_visited(&self, ident: &str) -> bool {
        self.visited_airports.iter().any(|visited| visited == ident)
    }

    /// Apply a hop that is known to fit the budget and classify it.
    pub(crate) fn commit(&mut self, destination: &str, distance: f64, time: f64) -> Outcome {
        debug_assert!(self.budget().covers(distance, time));
        self.remaining_distance -= distance;
        self.remaining_time -= time;
        self.current_airport = destination.to_string();
        self.visited_airports.push(destination.to_string());

        let before = self.goal_airports.len();
        self.goal_airports.retain(|goal| goal != destination);
        if self.goal_airports.len() == before {
            Outcome::Continue
        } else if self.goal_airports.is_empty() {
            self.status = GameStatus::Won;
            Outcome::Victory
        } else {
            Outcome::GoalReached
        }
    }

    /// End the game as lost without touching the route or budgets.
    pub(crate) fn strand(&mut self) {
        self.status = GameStatus::Lost;
    }

    /// Return to the starting airport with fresh budgets and goals.
    pub(crate) fn restart(&mut self) {
        self.current_airport = self.start_airport.clone();
        self.visited_airports = vec![self.start_airport.clone()];
        self.remaining_time = self.starting_budget.time;
        self.remaining_distance = self.starting_budget.distance;
        self.goal_airports = self.initial_goals.clone();
        self.status = GameStatus::Active;
    }
}
