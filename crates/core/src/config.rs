//! Layered application configuration.
//!
//! Values come from built-in defaults, then `~/.config/flightgame/config.toml`,
//! then `FLIGHTGAME_*` environment variables. Nested keys use `__`, e.g.
//! `FLIGHTGAME_RULES__FAILURE_POLICY=restart`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{directory::DirectoryFilter, game::GameRules, save::SaveManager, stats::JsonStatsStore};

/// Directory under the platform config dir.
pub const CONFIG_DIR: &str = "flightgame";
const CONFIG_FILE: &str = "config.toml";

const DEFAULT_CONFIG: &str = r#"# Flight game configuration.
# Every key is optional; remove the leading '#' to override a default.

# bind_addr = "127.0.0.1:3000"
# airports_path = "/path/to/airports.json"
# static_dir = "static"
# session_ttl_minutes = 60

[rules]
# starting_time = 420.0
# starting_distance = 3000.0
# goal_count = 1
# nearby_count = 5
# minutes_per_100km = 15.0
# failure_policy = "reject"   # or "restart"
# goal_pool = ["EFIV", "EFOU", "EFKS", "EFKT", "EFKE"]

[filter]
# country = "FI"
# kinds = ["medium_airport", "large_airport"]
"#;

/// Settings shared by the server and terminal client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP server listens on.
    pub bind_addr: String,
    /// Airport data file; the bundled dataset is used when unset.
    pub airports_path: Option<PathBuf>,
    /// Player statistics file.
    pub stats_path: PathBuf,
    /// Directory for terminal save games.
    pub save_dir: PathBuf,
    /// Static frontend served at `/` when present.
    pub static_dir: Option<PathBuf>,
    /// Idle minutes before a server session expires.
    pub session_ttl_minutes: i64,
    /// Game constants.
    pub rules: GameRules,
    /// Airport eligibility.
    pub filter: DirectoryFilter,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            airports_path: None,
            stats_path: JsonStatsStore::default_path(),
            save_dir: SaveManager::default_root(),
            static_dir: None,
            session_ttl_minutes: 60,
            rules: GameRules::default(),
            filter: DirectoryFilter::default(),
        }
    }
}

impl AppConfig {
    /// Location of the user config file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }

    /// Load configuration from the default file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration using `path` as the file layer. A missing file is
    /// not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults =
            Config::try_from(&AppConfig::default()).context("failed to encode default config")?;
        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("FLIGHTGAME")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .context("failed to deserialize configuration")?;
        Ok(config)
    }

    /// Session idle timeout.
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.max(1))
    }
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    write_default_config(AppConfig::config_path())
}

fn write_default_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), "Wrote default configuration");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{game::FailurePolicy, models::AirportKind};
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.rules, GameRules::default());
        assert_eq!(config.filter, DirectoryFilter::default());
        assert_eq!(config.session_ttl_minutes, 60);
        Ok(())
    }

    #[test]
    fn file_overrides_nested_keys() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
bind_addr = "0.0.0.0:8080"
airports_path = "/srv/airports.json"

[rules]
goal_count = 3
failure_policy = "restart"
starting_distance = 5000.0

[filter]
kinds = ["large_airport"]
"#,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.airports_path, Some(PathBuf::from("/srv/airports.json")));
        assert_eq!(config.rules.goal_count, 3);
        assert_eq!(config.rules.failure_policy, FailurePolicy::Restart);
        assert_eq!(config.rules.starting_distance, 5000.0);
        assert_eq!(config.rules.starting_time, 420.0);
        assert_eq!(config.filter.kinds, vec![AirportKind::LargeAirport]);
        assert_eq!(config.filter.country.as_deref(), Some("FI"));
        Ok(())
    }

    #[test]
    fn default_template_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("flightgame").join(CONFIG_FILE);
        write_default_config(path.clone())?;
        assert!(path.exists());
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.rules, GameRules::default());
        Ok(())
    }
}
