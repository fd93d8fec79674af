//! Per-country location counts for the summary table.

use std::collections::BTreeMap;

use location_map_models::{CountryCount, LocationRecord};

/// Counts named records per country, largest first.
///
/// Every record counts whether or not it geocoded. Records with an empty
/// country get no row, and records with an empty name are not counted.
/// Ties are ordered by country name so the table is stable between runs.
#[must_use]
pub fn country_counts(records: &[LocationRecord]) -> Vec<CountryCount> {
    let mut totals: BTreeMap<&str, u64> = BTreeMap::new();
    for record in records {
        if record.country.trim().is_empty() {
            continue;
        }
        let entry = totals.entry(record.country.as_str()).or_default();
        if !record.name.trim().is_empty() {
            *entry += 1;
        }
    }

    let mut counts: Vec<CountryCount> = totals
        .into_iter()
        .map(|(country, total)| CountryCount {
            country: country.to_string(),
            total,
        })
        .collect();

    // BTreeMap iteration is already name-ordered; a stable sort on the
    // count keeps that as the tie-break.
    counts.sort_by(|a, b| b.total.cmp(&a.total));
    counts
}
