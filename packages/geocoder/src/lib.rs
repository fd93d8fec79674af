#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Geocoding for location map data.
//!
//! Turns `"{address}, {city}, {country}"` queries into latitude/longitude
//! pairs through an external provider configured via TOML files in
//! `services/`:
//!
//! 1. **`OpenCage`** (priority 1): requires an API key read from
//!    `OPENCAGE_API_KEY`.
//! 2. **Nominatim / `OpenStreetMap`** (priority 2): no key. The public
//!    instance allows 1 request per second, so point `base_url` at a
//!    self-hosted instance for large tables.
//!
//! The [`resolver::Geocoder`] wraps a provider with a per-run
//! [`cache::GeocodeCache`] and a bounded [`retry::RetryPolicy`]: every
//! distinct query reaches the provider until it has one terminal outcome,
//! after which the cached outcome is returned.

pub mod cache;
pub mod nominatim;
pub mod opencage;
pub mod resolver;
pub mod retry;
pub mod service_registry;

use location_map_models::Coordinates;
use thiserror::Error;

pub use cache::GeocodeCache;
pub use resolver::{GeocodeStats, Geocoder};
pub use retry::RetryPolicy;

/// A provider match for a query.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedAddress {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
    /// The formatted address the provider matched, if it reported one.
    pub matched_address: Option<String>,
}

impl GeocodedAddress {
    /// Returns the match position.
    #[must_use]
    pub const fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

/// Whether a failed request is worth repeating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeouts, dropped connections, rate limiting, server errors.
    Transient,
    /// Rejected credentials, exhausted quota, bad requests, responses that
    /// don't have the expected shape.
    Permanent,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with an unexpected status code.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Response status code.
        status: u16,
        /// Provider's error message, or the status reason.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The API key is missing, invalid or disabled.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Provider's error message.
        message: String,
    },

    /// The account has used up its request quota.
    #[error("Request quota exceeded")]
    QuotaExceeded,

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}

impl GeocodeError {
    /// Classifies the error for the retry loop.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Http(e) => {
                if e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
                {
                    ErrorKind::Transient
                } else {
                    ErrorKind::Permanent
                }
            }
            Self::Status { status, .. } if *status >= 500 => ErrorKind::Transient,
            Self::RateLimited => ErrorKind::Transient,
            Self::Status { .. }
            | Self::Unauthorized { .. }
            | Self::QuotaExceeded
            | Self::Parse { .. } => ErrorKind::Permanent,
        }
    }
}

/// Errors from building a provider out of its service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The environment variable holding the provider's API key is unset or
    /// empty.
    #[error("{env_var} environment variable not set")]
    MissingApiKey {
        /// Name of the expected environment variable.
        env_var: String,
    },

    /// No service with the requested id exists.
    #[error("Unknown geocoding service '{id}' (available: {available})")]
    UnknownProvider {
        /// Requested id.
        id: String,
        /// Comma-separated ids that do exist.
        available: String,
    },

    /// An embedded service definition is malformed.
    #[error("Failed to parse geocoding service '{name}': {message}")]
    Parse {
        /// File stem of the definition.
        name: String,
        /// Parser message.
        message: String,
    },
}

/// A geocoding backend that answers free-text queries.
///
/// Implementations return only the provider's top-ranked match; there is
/// no confidence filtering or tie-breaking between candidates.
#[async_trait::async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Service identifier, as used in the service registry.
    fn id(&self) -> &str;

    /// Looks up a free-text query.
    ///
    /// Returns `Ok(None)` when the provider answered with zero matches.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails, the provider rejects
    /// it, or the response cannot be parsed.
    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_and_rate_limits_are_transient() {
        assert_eq!(GeocodeError::RateLimited.kind(), ErrorKind::Transient);
        let err = GeocodeError::Status {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transient);
    }

    #[test]
    fn client_errors_are_permanent() {
        let bad_request = GeocodeError::Status {
            status: 400,
            message: "invalid query".to_string(),
        };
        assert_eq!(bad_request.kind(), ErrorKind::Permanent);
        assert_eq!(GeocodeError::QuotaExceeded.kind(), ErrorKind::Permanent);
        let unauthorized = GeocodeError::Unauthorized {
            message: "invalid API key".to_string(),
        };
        assert_eq!(unauthorized.kind(), ErrorKind::Permanent);
        let parse = GeocodeError::Parse {
            message: "missing results".to_string(),
        };
        assert_eq!(parse.kind(), ErrorKind::Permanent);
    }
}
