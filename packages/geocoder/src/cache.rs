//! Per-run memo of terminal geocoding outcomes, keyed by query string.
//!
//! Created empty when a run starts and dropped with it. Nothing is written
//! to disk and entries are never evicted.

use std::collections::BTreeMap;

use location_map_models::GeocodeOutcome;

/// Query string to outcome map.
#[derive(Debug, Clone, Default)]
pub struct GeocodeCache {
    entries: BTreeMap<String, GeocodeOutcome>,
}

impl GeocodeCache {
    /// Creates an empty cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Returns the stored outcome for `query`, if any.
    #[must_use]
    pub fn get(&self, query: &str) -> Option<&GeocodeOutcome> {
        self.entries.get(query)
    }

    /// Stores an outcome, returning the one it replaced.
    pub fn insert(
        &mut self,
        query: impl Into<String>,
        outcome: GeocodeOutcome,
    ) -> Option<GeocodeOutcome> {
        self.entries.insert(query.into(), outcome)
    }

    /// Whether `query` already has an outcome.
    #[must_use]
    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    /// Number of distinct queries stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over stored entries in query order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GeocodeOutcome)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}
