use std::{collections::HashSet, fs, path::Path};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{normalize_ident, DirectoryFilter, StaticDirectory};
use crate::models::{Airport, AirportKind};

const EMBEDDED_AIRPORTS: &str = include_str!("../../data/airports.json");

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9-]{2,8}$").expect("failed to compile ident regex"));

/// Reads airport rows shaped like the `airport` table.
pub struct DirectoryLoader;

impl DirectoryLoader {
    /// Parse airports from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Vec<Airport>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read airport data {}", path.display()))?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parse the dataset bundled with the crate.
    pub fn embedded() -> Result<Vec<Airport>> {
        Self::parse(EMBEDDED_AIRPORTS, "embedded dataset")
    }

    /// Parse a JSON array of airport rows. Invalid rows are skipped.
    pub fn parse(content: &str, origin: &str) -> Result<Vec<Airport>> {
        let rows: Vec<RawAirport> = serde_json::from_str(content)
            .with_context(|| format!("failed to parse airport data from {origin}"))?;

        let mut seen = HashSet::new();
        let mut airports = Vec::with_capacity(rows.len());
        for (position, row) in rows.into_iter().enumerate() {
            match row.into_airport() {
                Ok(airport) => {
                    if !seen.insert(airport.ident.clone()) {
                        warn!(origin, ident = %airport.ident, "Skipping duplicate airport");
                        continue;
                    }
                    airports.push(airport);
                }
                Err(reason) => warn!(origin, row = position, "Skipping airport row: {reason}"),
            }
        }

        debug!(origin, count = airports.len(), "Airport data parsed");
        Ok(airports)
    }
}

/// Build a directory from `path`, or from the bundled dataset when no path
/// is configured.
pub fn load_directory(path: Option<&Path>, filter: DirectoryFilter) -> Result<StaticDirectory> {
    let airports = match path {
        Some(path) => DirectoryLoader::from_path(path)?,
        None => DirectoryLoader::embedded()?,
    };
    Ok(StaticDirectory::new(airports, filter))
}

#[derive(Debug, Deserialize)]
struct RawAirport {
    #[serde(default)]
    ident: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    latitude_deg: Option<f64>,
    #[serde(default)]
    longitude_deg: Option<f64>,
    #[serde(default)]
    iso_country: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<AirportKind>,
}

impl RawAirport {
    fn into_airport(self) -> Result<Airport, String> {
        let ident = self
            .ident
            .map(|value| normalize_ident(&value))
            .ok_or_else(|| "missing ident".to_string())?;
        if !IDENT_RE.is_match(&ident) {
            return Err(format!("invalid ident '{ident}'"));
        }

        let latitude = self
            .latitude_deg
            .filter(|value| (-90.0..=90.0).contains(value))
            .ok_or_else(|| format!("{ident}: latitude missing or out of range"))?;
        let longitude = self
            .longitude_deg
            .filter(|value| (-180.0..=180.0).contains(value))
            .ok_or_else(|| format!("{ident}: longitude missing or out of range"))?;

        let name = self
            .name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| ident.clone());

        Ok(Airport {
            ident,
            name,
            latitude,
            longitude,
            iso_country: self
                .iso_country
                .map(|value| value.trim().to_ascii_uppercase())
                .unwrap_or_default(),
            kind: self.kind.unwrap_or(AirportKind::Other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::AirportDirectory;
    use tempfile::tempdir;

    #[test]
    fn embedded_dataset_has_goal_airports() -> Result<()> {
        let directory = load_directory(None, DirectoryFilter::default())?;
        for ident in ["EFHK", "EFIV", "EFOU", "EFKS", "EFKT", "EFKE"] {
            assert!(directory.lookup(ident).is_ok(), "{ident} missing");
        }
        assert!(directory
            .eligible()
            .iter()
            .all(|airport| airport.iso_country == "FI"));
        Ok(())
    }

    #[test]
    fn skips_invalid_rows() -> Result<()> {
        let airports = DirectoryLoader::parse(
            r#"[
                {"ident": "efhk", "name": "Helsinki", "latitude_deg": 60.3, "longitude_deg": 24.9,
                 "iso_country": "fi", "type": "large_airport"},
                {"ident": "EFHK", "name": "Dup", "latitude_deg": 1.0, "longitude_deg": 1.0},
                {"ident": "bad ident!", "latitude_deg": 1.0, "longitude_deg": 1.0},
                {"ident": "EFXX", "latitude_deg": 95.0, "longitude_deg": 1.0},
                {"ident": "EFYY", "latitude_deg": 61.0, "longitude_deg": 25.0, "type": "seaplane_base"}
            ]"#,
            "test",
        )?;

        assert_eq!(airports.len(), 2);
        assert_eq!(airports[0].ident, "EFHK");
        assert_eq!(airports[0].iso_country, "FI");
        assert_eq!(airports[0].kind, AirportKind::LargeAirport);
        assert_eq!(airports[1].name, "EFYY");
        assert_eq!(airports[1].kind, AirportKind::Other);
        Ok(())
    }

    #[test]
    fn loads_external_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("airports.json");
        fs::write(
            &path,
            r#"[{"ident": "EFTU", "name": "Turku", "latitude_deg": 60.5, "longitude_deg": 22.3,
                 "iso_country": "FI", "type": "medium_airport"}]"#,
        )?;

        let embedded = load_directory(None, DirectoryFilter::default())?;
        assert!(embedded.len() > 1);
        let directory = load_directory(Some(path.as_path()), DirectoryFilter::default())?;
        assert_eq!(directory.len(), 1);
        assert_eq!(directory.eligible().len(), 1);
        assert!(directory.lookup("EFHK").is_err());

        assert!(DirectoryLoader::from_path(dir.path().join("missing.json")).is_err());
        Ok(())
    }
}
