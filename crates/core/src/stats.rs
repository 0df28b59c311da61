//! Aggregate per-player statistics.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::game::{FlightReport, GameState, Outcome};

/// File name used under the config directory.
pub const DEFAULT_STATS_FILE: &str = "flightgame/player_stats.json";

/// Counters kept for one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Player the record belongs to.
    pub player_name: String,
    /// Games won.
    pub wins: u32,
    /// Games lost to an exhausted budget.
    pub losses: u32,
    /// Kilometres flown across finished games.
    pub total_distance_km: f64,
    /// Minutes flown across finished games.
    pub total_time_minutes: f64,
    /// Number of airports on the most recently recorded route.
    pub airports_visited: usize,
    /// Most recently recorded route.
    #[serde(default)]
    pub last_route: Vec<String>,
    /// Time of the last update.
    pub updated_at: DateTime<Utc>,
}

impl PlayerStats {
    fn new(player_name: &str) -> Self {
        Self {
            player_name: player_name.to_string(),
            wins: 0,
            losses: 0,
            total_distance_km: 0.0,
            total_time_minutes: 0.0,
            airports_visited: 0,
            last_route: Vec::new(),
            updated_at: Utc::now(),
        }
    }
}

/// Write-mostly store of player counters.
pub trait StatsStore: Send + Sync {
    /// Count a win and add its usage to the totals.
    fn record_win(&self, player: &str, time_used: f64, distance_used: f64) -> Result<()>;

    /// Count a loss and add its usage to the totals.
    fn record_loss(&self, player: &str, time_used: f64, distance_used: f64) -> Result<()>;

    /// Overwrite the player's latest route snapshot.
    fn record_visit(
        &self,
        player: &str,
        visited: &[String],
        time_used: f64,
        distance_used: f64,
    ) -> Result<()>;

    /// Current counters for `player`, if any were recorded.
    fn get(&self, player: &str) -> Result<Option<PlayerStats>>;
}

/// Stats persisted as a pretty-printed JSON map keyed by player name.
pub struct JsonStatsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonStatsStore {
    /// Create a store writing to `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Default location under the user's config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_STATS_FILE)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modify(&self, player: &str, apply: impl FnOnce(&mut PlayerStats)) -> Result<()> {
        let _guard = self.lock.lock();
        let mut records = self.read_all()?;
        let record = records
            .entry(player.to_string())
            .or_insert_with(|| PlayerStats::new(player));
        apply(record);
        record.updated_at = Utc::now();
        self.write_all(&records)
    }

    fn read_all(&self) -> Result<BTreeMap<String, PlayerStats>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let records = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;
        Ok(records)
    }

    fn write_all(&self, records: &BTreeMap<String, PlayerStats>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(records)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

impl StatsStore for JsonStatsStore {
    fn record_win(&self, player: &str, time_used: f64, distance_used: f64) -> Result<()> {
        self.modify(player, |record| {
            record.wins += 1;
            record.total_time_minutes += time_used;
            record.total_distance_km += distance_used;
        })
    }

    fn record_loss(&self, player: &str, time_used: f64, distance_used: f64) -> Result<()> {
        self.modify(player, |record| {
            record.losses += 1;
            record.total_time_minutes += time_used;
            record.total_distance_km += distance_used;
        })
    }

    fn record_visit(
        &self,
        player: &str,
        visited: &[String],
        _time_used: f64,
        _distance_used: f64,
    ) -> Result<()> {
        self.modify(player, |record| {
            record.last_route = visited.to_vec();
            record.airports_visited = visited.len();
        })
    }

    fn get(&self, player: &str) -> Result<Option<PlayerStats>> {
        let _guard = self.lock.lock();
        Ok(self.read_all()?.remove(player))
    }
}

/// Push the counters implied by a finished move. Store failures are logged
/// and swallowed; statistics never block play.
pub fn record_outcome(store: &dyn StatsStore, state: &GameState, report: &FlightReport) {
    let player = state.player_name.as_str();
    let result = match report.outcome {
        Outcome::Continue => return,
        Outcome::GoalReached => store.record_visit(
            player,
            &state.visited_airports,
            state.time_used(),
            state.distance_used(),
        ),
        Outcome::Victory => store
            .record_visit(
                player,
                &state.visited_airports,
                state.time_used(),
                state.distance_used(),
            )
            .and_then(|_| store.record_win(player, state.time_used(), state.distance_used())),
        Outcome::Restart => {
            let lost = report.abandoned.as_ref().unwrap_or(state);
            store.record_loss(player, lost.time_used(), lost.distance_used())
        }
        Outcome::Stranded => store
            .record_visit(
                player,
                &state.visited_airports,
                state.time_used(),
                state.distance_used(),
            )
            .and_then(|_| store.record_loss(player, state.time_used(), state.distance_used())),
    };

    match result {
        Ok(()) => debug!(player, outcome = report.outcome.as_str(), "Stats recorded"),
        Err(err) => warn!(player, "Failed to record stats: {err:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Budget, Difficulty, GameStatus};
    use tempfile::tempdir;

    fn finished_state() -> GameState {
        GameState {
            player_name: "Aino".to_string(),
            start_airport: "EFHK".to_string(),
            current_airport: "EFOU".to_string(),
            visited_airports: vec!["EFHK".to_string(), "EFOU".to_string()],
            remaining_time: 343.0,
            remaining_distance: 2486.0,
            goal_airports: Vec::new(),
            initial_goals: vec!["EFOU".to_string()],
            difficulty: Difficulty::Normal,
            starting_budget: Budget {
                time: 420.0,
                distance: 3000.0,
            },
            status: GameStatus::Won,
        }
    }

    fn report(outcome: Outcome, abandoned: Option<GameState>) -> FlightReport {
        FlightReport {
            outcome,
            destination: "EFOU".to_string(),
            distance: 514.0,
            flight_time: 77.1,
            flown: outcome != Outcome::Restart,
            locations: Vec::new(),
            abandoned,
        }
    }

    #[test]
    fn counters_accumulate_on_disk() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStatsStore::new(dir.path().join("nested/stats.json"));
        assert!(store.get("Aino")?.is_none());

        store.record_win("Aino", 77.0, 514.0)?;
        store.record_loss("Aino", 100.0, 600.0)?;
        store.record_visit("Aino", &["EFHK".to_string(), "EFOU".to_string()], 0.0, 0.0)?;

        let reopened = JsonStatsStore::new(store.path());
        let stats = reopened.get("Aino")?.expect("stats recorded");
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.total_time_minutes, 177.0);
        assert_eq!(stats.total_distance_km, 1114.0);
        assert_eq!(stats.airports_visited, 2);
        assert_eq!(stats.last_route, vec!["EFHK", "EFOU"]);
        assert!(reopened.get("Ville")?.is_none());
        Ok(())
    }

    #[test]
    fn victory_records_visit_and_win() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStatsStore::new(dir.path().join("stats.json"));
        let state = finished_state();

        record_outcome(&store, &state, &report(Outcome::Victory, None));

        let stats = store.get("Aino")?.expect("stats recorded");
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.total_time_minutes, 77.0);
        assert_eq!(stats.total_distance_km, 514.0);
        assert_eq!(stats.last_route, state.visited_airports);
        Ok(())
    }

    #[test]
    fn restart_records_loss_from_abandoned_state() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStatsStore::new(dir.path().join("stats.json"));
        let abandoned = finished_state();
        let mut reset = abandoned.clone();
        reset.restart();

        record_outcome(&store, &reset, &report(Outcome::Restart, Some(abandoned)));
        record_outcome(&store, &reset, &report(Outcome::Continue, None));

        let stats = store.get("Aino")?.expect("stats recorded");
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.total_distance_km, 514.0);
        Ok(())
    }

    #[test]
    fn stranded_game_records_loss_and_route() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonStatsStore::new(dir.path().join("stats.json"));
        let mut state = finished_state();
        state.goal_airports = vec!["EFIV".to_string()];
        state.status = GameStatus::Lost;

        record_outcome(&store, &state, &report(Outcome::Stranded, None));

        let stats = store.get("Aino")?.expect("stats recorded");
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.total_distance_km, 514.0);
        assert_eq!(stats.last_route, state.visited_airports);
        Ok(())
    }

    #[test]
    fn unreadable_store_does_not_panic() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stats.json");
        fs::write(&path, "not json")?;
        let store = JsonStatsStore::new(&path);
        record_outcome(&store, &finished_state(), &report(Outcome::Victory, None));
        assert!(store.get("Aino").is_err());
        Ok(())
    }
}
