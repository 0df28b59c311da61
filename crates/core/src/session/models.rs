use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{error::GameError, game::GameState};

/// 128-bit random session identifier rendered as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(u128);

impl SessionId {
    /// Draw a fresh identifier.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = GameError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.len() != 32 {
            return Err(GameError::SessionNotFound(trimmed.to_string()));
        }
        u128::from_str_radix(trimmed, 16)
            .map(SessionId)
            .map_err(|_| GameError::SessionNotFound(trimmed.to_string()))
    }
}

impl TryFrom<String> for SessionId {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(value: SessionId) -> Self {
        value.to_string()
    }
}

/// Stored state plus bookkeeping.
#[derive(Debug, Clone)]
pub(crate) struct SessionEntry {
    pub(crate) state: GameState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_seen: DateTime<Utc>,
}

/// Read-only copy of a session handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub id: SessionId,
    /// Game state at the time of the read.
    pub state: GameState,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last read or update.
    pub last_seen: DateTime<Utc>,
}
