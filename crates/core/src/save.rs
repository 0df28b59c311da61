//! Save-game persistence for the terminal client.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::game::GameState;

/// Root directory under `~/.config` used for save files.
pub const DEFAULT_SAVE_DIR: &str = "flightgame/saves";

/// Metadata describing a persisted game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveEntry {
    /// Absolute path to the save file on disk.
    pub path: PathBuf,
    /// Player the game belongs to.
    pub player_name: String,
    /// Airport the player is currently at.
    pub current_airport: String,
    /// Whether the game already ended.
    pub finished: bool,
    /// Timestamp when the save was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Serialized representation of a save file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePayload {
    saved_at: DateTime<Utc>,
    state: GameState,
}

impl SavePayload {
    /// Consume the payload and return the stored game state.
    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Borrow the stored game state without consuming the payload.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    fn entry(&self, path: PathBuf) -> SaveEntry {
        SaveEntry {
            path,
            player_name: self.state.player_name.clone(),
            current_airport: self.state.current_airport.clone(),
            finished: self.state.is_finished(),
            updated_at: self.saved_at,
        }
    }
}

/// Manager responsible for loading and writing save files.
pub struct SaveManager {
    root: PathBuf,
}

impl SaveManager {
    /// Create a new manager rooted at the provided directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DEFAULT_SAVE_DIR)
    }

    /// Return all known saves sorted by timestamp (most recent first).
    pub fn entries(&self) -> Result<Vec<SaveEntry>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root).context("failed to read save directory")? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if entry.path().extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match self.read_payload(entry.path()) {
                Ok(payload) => entries.push(payload.entry(entry.path())),
                Err(err) => {
                    warn!("Failed to read save {:?}: {err}", entry.path());
                }
            }
        }

        entries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(entries)
    }

    /// Write a new save for `state` and return its entry.
    pub fn create_save(&self, state: &GameState) -> Result<SaveEntry> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))?;

        let payload = SavePayload {
            saved_at: Utc::now(),
            state: state.clone(),
        };
        let file_name = format!(
            "{}_{}.json",
            sanitize_component(&state.player_name),
            payload.saved_at.format("%Y%m%d%H%M%S%3f")
        );
        let path = self.root.join(file_name);
        self.write_payload(&path, &payload)?;
        Ok(payload.entry(path))
    }

    /// Overwrite an existing save with updated state.
    pub fn update_save(&self, entry: &SaveEntry, state: &GameState) -> Result<SaveEntry> {
        let payload = SavePayload {
            saved_at: Utc::now(),
            state: state.clone(),
        };
        self.write_payload(&entry.path, &payload)?;
        Ok(payload.entry(entry.path.clone()))
    }

    /// Load payload for the provided entry.
    pub fn load(&self, entry: &SaveEntry) -> Result<SavePayload> {
        self.read_payload(&entry.path)
    }

    /// Most recent save of a game that is still in progress, if any.
    pub fn latest_active(&self) -> Result<Option<SaveEntry>> {
        Ok(self.entries()?.into_iter().find(|entry| !entry.finished))
    }

    /// Delete a save file.
    pub fn remove(&self, entry: &SaveEntry) -> Result<()> {
        fs::remove_file(&entry.path)
            .with_context(|| format!("failed to remove {}", entry.path.display()))
    }

    fn write_payload(&self, path: &Path, payload: &SavePayload) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(payload)?;
        fs::write(path, serialised).with_context(|| format!("failed to write {}", path.display()))
    }

    fn read_payload(&self, path: impl AsRef<Path>) -> Result<SavePayload> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let payload = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(payload)
    }
}

fn sanitize_component(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            result.push(ch);
        }
    }
    if result.is_empty() {
        "player".to_string()
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Budget, Difficulty, GameStatus};
    use tempfile::tempdir;

    fn sample_state(player: &str) -> GameState {
        GameState {
            player_name: player.to_string(),
            start_airport: "EFHK".to_string(),
            current_airport: "EFHK".to_string(),
            visited_airports: vec!["EFHK".to_string()],
            remaining_time: 420.0,
            remaining_distance: 3000.0,
            goal_airports: vec!["EFIV".to_string()],
            initial_goals: vec!["EFIV".to_string()],
            difficulty: Difficulty::Normal,
            starting_budget: Budget {
                time: 420.0,
                distance: 3000.0,
            },
            status: GameStatus::Active,
        }
    }

    #[test]
    fn save_update_and_resume() -> Result<()> {
        let dir = tempdir()?;
        let manager = SaveManager::new(dir.path());
        let mut state = sample_state("Aino");

        let entry = manager.create_save(&state)?;
        assert!(entry.path.exists());
        assert_eq!(entry.player_name, "Aino");

        state.current_airport = "EFTU".to_string();
        state.visited_airports.push("EFTU".to_string());
        let updated = manager.update_save(&entry, &state)?;
        assert!(updated.updated_at >= entry.updated_at);

        let entries = manager.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].current_airport, "EFTU");

        let latest = manager.latest_active()?.expect("expected active save");
        let restored = manager.load(&latest)?.into_state();
        assert_eq!(restored, state);

        state.status = GameStatus::Won;
        manager.update_save(&latest, &state)?;
        assert!(manager.latest_active()?.is_none());

        manager.remove(&latest)?;
        assert!(manager.entries()?.is_empty());
        Ok(())
    }

    #[test]
    fn ignores_foreign_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("notes.txt"), "hello")?;
        fs::write(dir.path().join("broken.json"), "{")?;
        let manager = SaveManager::new(dir.path());
        assert!(manager.entries()?.is_empty());
        Ok(())
    }

    #[test]
    fn sanitize_creates_safe_filenames() {
        assert_eq!(sanitize_component("Äiti Ö/../x"), "itix");
        assert_eq!(sanitize_component("!!"), "player");
    }
}
