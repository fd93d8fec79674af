//! Random marker displacement.
//!
//! Locations that geocode to the same point (same building, or a city
//! centroid fallback) would otherwise draw as a single dot. Each plotted
//! position gets an independent uniform offset in `[-strength, strength]`
//! degrees on both axes. The geocoded coordinates in
//! [`GeocodedLocation::outcome`] are left untouched.

use location_map_models::{Coordinates, GeocodedLocation};
use rand::Rng;

use crate::AnalyticsError;

/// Default offset bound in degrees. Raise it when many markers stack.
pub const DEFAULT_JITTER_STRENGTH: f64 = 0.2;

/// Rejects strengths that are negative, NaN or infinite.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidJitter`] for such values.
pub fn check_strength(strength: f64) -> Result<(), AnalyticsError> {
    if !strength.is_finite() || strength < 0.0 {
        return Err(AnalyticsError::InvalidJitter { strength });
    }
    Ok(())
}

/// Offsets every plotted position by up to `strength` degrees per axis.
///
/// Locations without a position (missing or failed lookups) are skipped.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidJitter`] if `strength` is negative,
/// NaN or infinite.
pub fn apply_jitter<R: Rng>(
    locations: &mut [GeocodedLocation],
    strength: f64,
    rng: &mut R,
) -> Result<(), AnalyticsError> {
    check_strength(strength)?;

    for location in locations.iter_mut() {
        if let Some(position) = location.position {
            location.position = Some(Coordinates::new(
                position.latitude + rng.gen_range(-strength..=strength),
                position.longitude + rng.gen_range(-strength..=strength),
            ));
        }
    }

    Ok(())
}
