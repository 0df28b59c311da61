//! Shared domain models.

use serde::{Deserialize, Serialize};

/// Classification of an airport record, mirroring the `type` column of the
/// airport table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirportKind {
    /// Small airfield.
    SmallAirport,
    /// Regional airport.
    MediumAirport,
    /// Major airport.
    LargeAirport,
    /// Heliport.
    Heliport,
    /// Closed field.
    Closed,
    /// Anything else found in the source data.
    #[serde(other)]
    Other,
}

/// Immutable airport reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Airport {
    /// ICAO-style identifier (e.g. `EFHK`).
    pub ident: String,
    /// Human-readable airport name.
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// ISO 3166 country code.
    pub iso_country: String,
    /// Airport classification.
    pub kind: AirportKind,
}

impl Airport {
    /// Coordinates as a `(latitude, longitude)` pair.
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    /// Returns a user-facing label combining ident and name.
    pub fn display_name(&self) -> String {
        format!("{} · {}", self.ident, self.name)
    }
}

/// An airport annotated with its distance from a reference point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAirport {
    /// Airport identifier.
    pub id: String,
    /// Airport name.
    pub name: String,
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Distance from the reference airport in kilometres.
    pub distance: f64,
    /// Flight time for the hop in minutes.
    pub flight_time: f64,
    /// True for the player's current airport.
    pub active: bool,
    /// True when both budgets cover the hop.
    pub reachable: bool,
}
