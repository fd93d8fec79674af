#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Post-geocoding transforms for the location map.
//!
//! - [`jitter`] nudges marker positions apart so stacked locations stay
//!   individually visible.
//! - [`aggregate`] counts locations per country for the overlay table.

pub mod aggregate;
pub mod jitter;

use thiserror::Error;

pub use aggregate::country_counts;
pub use jitter::{DEFAULT_JITTER_STRENGTH, apply_jitter, check_strength};

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Jitter strength must be a finite, non-negative number of degrees.
    #[error("Invalid jitter strength {strength}: must be finite and >= 0")]
    InvalidJitter {
        /// The rejected strength.
        strength: f64,
    },
}
