//! Read-only airport reference data.

/// JSON loading and validation of airport records.
pub mod loader;

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::{GameError, GameResult},
    models::{Airport, AirportKind},
};

pub use loader::{load_directory, DirectoryLoader};

/// Lookup interface consumed by the game engine.
pub trait AirportDirectory: Send + Sync {
    /// Resolve an airport by identifier, failing with [`GameError::NotFound`].
    fn lookup(&self, ident: &str) -> GameResult<Airport>;

    /// Airports that may appear in rankings and be picked as goals.
    fn eligible(&self) -> Vec<Airport>;
}

/// Restricts which airports take part in play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryFilter {
    /// ISO country code to keep, or `None` for every country.
    #[serde(default)]
    pub country: Option<String>,
    /// Airport kinds to keep. Empty keeps all kinds.
    #[serde(default)]
    pub kinds: Vec<AirportKind>,
}

impl Default for DirectoryFilter {
    fn default() -> Self {
        Self {
            country: Some("FI".to_string()),
            kinds: vec![AirportKind::MediumAirport, AirportKind::LargeAirport],
        }
    }
}

impl DirectoryFilter {
    /// Filter that admits every record.
    pub fn any() -> Self {
        Self {
            country: None,
            kinds: Vec::new(),
        }
    }

    /// Whether the airport passes the filter.
    pub fn matches(&self, airport: &Airport) -> bool {
        let country_ok = self
            .country
            .as_deref()
            .map(|country| airport.iso_country.eq_ignore_ascii_case(country))
            .unwrap_or(true);
        let kind_ok = self.kinds.is_empty() || self.kinds.contains(&airport.kind);
        country_ok && kind_ok
    }
}

/// Immutable in-memory directory. Clones share the same records.
#[derive(Clone)]
pub struct StaticDirectory {
    inner: Arc<Inner>,
}

struct Inner {
    airports: Vec<Airport>,
    index: HashMap<String, usize>,
    filter: DirectoryFilter,
}

impl Inner {
    fn new(airports: Vec<Airport>, filter: DirectoryFilter) -> Self {
        let index = airports
            .iter()
            .enumerate()
            .map(|(position, airport)| (normalize_ident(&airport.ident), position))
            .collect();
        Self {
            airports,
            index,
            filter,
        }
    }
}

impl StaticDirectory {
    /// Build a directory over the given records.
    pub fn new(airports: Vec<Airport>, filter: DirectoryFilter) -> Self {
        Self {
            inner: Arc::new(Inner::new(airports, filter)),
        }
    }

    /// Total number of records, eligible or not.
    pub fn len(&self) -> usize {
        self.inner.airports.len()
    }

    /// True when the directory holds no records.
    pub fn is_empty(&self) -> bool {
        self.inner.airports.is_empty()
    }

    /// Active eligibility filter.
    pub fn filter(&self) -> DirectoryFilter {
        self.inner.filter.clone()
    }
}

impl AirportDirectory for StaticDirectory {
    fn lookup(&self, ident: &str) -> GameResult<Airport> {
        let inner = &self.inner;
        inner
            .index
            .get(&normalize_ident(ident))
            .and_then(|position| inner.airports.get(*position))
            .cloned()
            .ok_or_else(|| GameError::NotFound(ident.trim().to_string()))
    }

    fn eligible(&self) -> Vec<Airport> {
        let inner = &self.inner;
        inner
            .airports
            .iter()
            .filter(|airport| inner.filter.matches(airport))
            .cloned()
            .collect()
    }
}

/// Canonical form used for identifier comparisons.
pub fn normalize_ident(ident: &str) -> String {
    ident.trim().to_ascii_uppercase()
}
