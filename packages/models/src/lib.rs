#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared types for the location map toolchain.
//!
//! A [`LocationRecord`] is one validated row of the input table. The
//! geocoder turns it into a [`GeocodeOutcome`], the pipeline pairs the two
//! into a [`GeocodedLocation`], and the analytics crate summarises records
//! into [`CountryCount`] rows for the overlay table.

pub mod progress;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single location row with all four critical columns populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    /// 1-based data row number (the header row is not counted).
    pub line: u64,
    /// Display name of the location.
    pub name: String,
    /// Country the location belongs to. Also the grouping key for the map
    /// colours and the summary table.
    pub country: String,
    /// City name.
    pub city: String,
    /// Street address.
    pub address: String,
}

impl LocationRecord {
    /// Builds the free-text geocoding query for this record.
    ///
    /// The same string doubles as the geocode cache key.
    #[must_use]
    pub fn query_key(&self) -> String {
        query_key(&self.country, &self.city, &self.address)
    }
}

/// Builds the `"{address}, {city}, {country}"` query string.
#[must_use]
pub fn query_key(country: &str, city: &str, address: &str) -> String {
    format!("{address}, {city}, {country}")
}

/// A WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl Coordinates {
    /// Creates a coordinate pair.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Terminal result of geocoding one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GeocodeOutcome {
    /// The provider returned at least one match; this is the first one.
    Resolved(Coordinates),
    /// The provider answered but had no match for the query.
    Missing,
    /// The lookup gave up after a permanent error or exhausted retries.
    Failed {
        /// Last error message seen for the query.
        reason: String,
    },
}

impl GeocodeOutcome {
    /// Returns the coordinates for a resolved outcome and `None` (the
    /// missing sentinel) otherwise.
    #[must_use]
    pub const fn coordinates(&self) -> Option<Coordinates> {
        match self {
            Self::Resolved(coords) => Some(*coords),
            Self::Missing | Self::Failed { .. } => None,
        }
    }

    /// Whether the lookup ended in [`GeocodeOutcome::Failed`].
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// A record together with its geocoding outcome and plotted position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedLocation {
    /// The source row.
    pub record: LocationRecord,
    /// What the geocoder returned for the row's query.
    pub outcome: GeocodeOutcome,
    /// Where the marker is drawn. Starts as the geocoded coordinates and
    /// is moved by jitter; `None` means the row is not plotted.
    pub position: Option<Coordinates>,
}

impl GeocodedLocation {
    /// Pairs a record with its outcome, placing the marker exactly on the
    /// geocoded coordinates.
    #[must_use]
    pub fn new(record: LocationRecord, outcome: GeocodeOutcome) -> Self {
        let position = outcome.coordinates();
        Self {
            record,
            outcome,
            position,
        }
    }
}

/// Number of locations recorded for one country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryCount {
    /// Country name as written in the input.
    pub country: String,
    /// Number of location rows for that country.
    pub total: u64,
}
