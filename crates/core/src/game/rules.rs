use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::GameError, geo::MINUTES_PER_100_KM};

/// Goal airports used when no pool is configured.
pub const DEFAULT_GOAL_POOL: [&str; 5] = ["EFIV", "EFOU", "EFKS", "EFKT", "EFKE"];

/// What happens when a hop exceeds the remaining budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Refuse the hop with [`GameError::InsufficientBudget`]; state is untouched.
    #[default]
    Reject,
    /// Reset the game to its starting airport and budgets.
    Restart,
}

/// Time and distance allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// Minutes.
    pub time: f64,
    /// Kilometres.
    pub distance: f64,
}

impl Budget {
    /// Budget that covers any hop.
    pub fn unlimited() -> Self {
        Self {
            time: f64::INFINITY,
            distance: f64::INFINITY,
        }
    }

    /// Whether a hop of the given size fits.
    pub fn covers(&self, distance: f64, time: f64) -> bool {
        self.distance >= distance && self.time >= time
    }
}

/// Starting budget presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// 480 minutes, 4000 km.
    Easy,
    /// The configured starting budget.
    #[default]
    Normal,
    /// 300 minutes, 2000 km.
    Hard,
}

impl Difficulty {
    /// Every preset, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Lowercase label used on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "" | "normal" => Ok(Difficulty::Normal),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(GameError::InvalidParameter {
                name: "difficulty",
                value: value.to_string(),
            }),
        }
    }
}

/// Tunable game constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Starting time budget in minutes for [`Difficulty::Normal`].
    pub starting_time: f64,
    /// Starting distance budget in kilometres for [`Difficulty::Normal`].
    pub starting_distance: f64,
    /// Number of goal airports drawn per game.
    pub goal_count: usize,
    /// Length of the nearby-airport ranking.
    pub nearby_count: usize,
    /// Flight rate.
    pub minutes_per_100km: f64,
    /// Budget failure handling.
    pub failure_policy: FailurePolicy,
    /// Candidate goal identifiers. Empty means every eligible airport.
    pub goal_pool: Vec<String>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starting_time: 420.0,
            starting_distance: 3000.0,
            goal_count: 1,
            nearby_count: 5,
            minutes_per_100km: MINUTES_PER_100_KM,
            failure_policy: FailurePolicy::Reject,
            goal_pool: DEFAULT_GOAL_POOL.iter().map(|id| id.to_string()).collect(),
        }
    }
}

impl GameRules {
    /// Starting budget for the given preset.
    pub fn budget_for(&self, difficulty: Difficulty) -> Budget {
        match difficulty {
            Difficulty::Easy => Budget {
                time: 480.0,
                distance: 4000.0,
            },
            Difficulty::Normal => Budget {
                time: self.starting_time,
                distance: self.starting_distance,
            },
            Difficulty::Hard => Budget {
                time: 300.0,
                distance: 2000.0,
            },
        }
    }
}
