//! Compile-time registry of geocoding service configurations.
//!
//! Each geocoding provider is defined in a TOML file under `services/`.
//! The registry embeds these at compile time and exposes them via
//! [`all_services`], [`enabled_services`] and [`find_service`].
//! [`create_provider`] turns a definition into a live client.

use serde::Deserialize;

use crate::nominatim::NominatimProvider;
use crate::opencage::OpenCageProvider;
use crate::{ConfigError, GeocodeProvider};

/// A geocoding service configuration loaded from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodingService {
    /// Unique identifier (e.g., `"opencage"`, `"nominatim"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Whether this service can be selected.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Preference order; the lowest enabled value is the default.
    pub priority: u32,
    /// Provider-specific configuration.
    pub provider: ProviderConfig,
}

/// Provider-specific configuration, tagged by `type` in TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// `OpenCage` forward geocoding API.
    OpenCage {
        /// API endpoint (e.g., `"https://api.opencagedata.com/geocode/v1/json"`).
        base_url: String,
        /// Environment variable holding the API key.
        api_key_env: String,
        /// Optional IETF language tag for formatted results.
        #[serde(default)]
        language: Option<String>,
    },
    /// Nominatim / `OpenStreetMap` search.
    Nominatim {
        /// Search endpoint (e.g., `"https://nominatim.openstreetmap.org/search"`).
        base_url: String,
    },
}

const fn default_true() -> bool {
    true
}

impl GeocodingService {
    /// Returns the provider's base URL regardless of variant.
    #[must_use]
    pub fn base_url(&self) -> &str {
        match &self.provider {
            ProviderConfig::OpenCage { base_url, .. } | ProviderConfig::Nominatim { base_url } => {
                base_url
            }
        }
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const SERVICE_TOMLS: &[(&str, &str)] = &[
    ("opencage", include_str!("../services/opencage.toml")),
    ("nominatim", include_str!("../services/nominatim.toml")),
];

#[cfg(test)]
const EXPECTED_SERVICE_COUNT: usize = 2;

/// Returns all geocoding service configurations (enabled and disabled).
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if an embedded definition is malformed.
pub fn all_services() -> Result<Vec<GeocodingService>, ConfigError> {
    SERVICE_TOMLS
        .iter()
        .map(|(name, toml_str)| {
            toml::de::from_str(toml_str).map_err(|e| ConfigError::Parse {
                name: (*name).to_string(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Returns only enabled services, sorted by priority (ascending).
///
/// # Errors
///
/// See [`all_services`].
pub fn enabled_services() -> Result<Vec<GeocodingService>, ConfigError> {
    let mut services: Vec<GeocodingService> =
        all_services()?.into_iter().filter(|s| s.enabled).collect();
    services.sort_by_key(|s| s.priority);
    Ok(services)
}

/// Looks up an enabled service by id, or the highest-priority enabled
/// service when `id` is `None`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownProvider`] if no enabled service matches.
pub fn find_service(id: Option<&str>) -> Result<GeocodingService, ConfigError> {
    let services = enabled_services()?;
    let found = match id {
        Some(id) => services.iter().find(|s| s.id.eq_ignore_ascii_case(id)),
        None => services.first(),
    };

    found.cloned().ok_or_else(|| ConfigError::UnknownProvider {
        id: id.unwrap_or("<default>").to_string(),
        available: services
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    })
}

/// Builds a provider client for `service`.
///
/// # Errors
///
/// Returns [`ConfigError::MissingApiKey`] if the service needs a key that
/// is not set in the environment.
pub fn create_provider(
    service: &GeocodingService,
    client: reqwest::Client,
) -> Result<Box<dyn GeocodeProvider>, ConfigError> {
    match &service.provider {
        ProviderConfig::OpenCage {
            base_url,
            api_key_env,
            language,
        } => Ok(Box::new(
            OpenCageProvider::from_env(client, base_url, api_key_env)?
                .with_language(language.clone()),
        )),
        ProviderConfig::Nominatim { base_url } => {
            Ok(Box::new(NominatimProvider::new(client, base_url)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn loads_all_services() {
        let services = all_services().unwrap();
        assert_eq!(services.len(), EXPECTED_SERVICE_COUNT);
    }

    #[test]
    fn service_ids_are_unique() {
        let services = all_services().unwrap();
        let mut seen = BTreeSet::new();
        for svc in &services {
            assert!(seen.insert(&svc.id), "Duplicate service ID: {}", svc.id);
        }
    }

    #[test]
    fn all_services_have_required_fields() {
        for svc in &all_services().unwrap() {
            assert!(!svc.id.is_empty(), "Service has empty id");
            assert!(!svc.name.is_empty(), "Service {} has empty name", svc.id);
            assert!(
                !svc.base_url().is_empty(),
                "Service {} has empty base_url",
                svc.id
            );
        }
    }

    #[test]
    fn enabled_services_sorted_by_priority() {
        let services = enabled_services().unwrap();
        for window in services.windows(2) {
            assert!(
                window[0].priority <= window[1].priority,
                "Services not sorted by priority: {} ({}) > {} ({})",
                window[0].id,
                window[0].priority,
                window[1].id,
                window[1].priority
            );
        }
    }

    #[test]
    fn default_service_is_opencage() {
        assert_eq!(find_service(None).unwrap().id, "opencage");
    }

    #[test]
    fn finds_service_case_insensitively() {
        assert_eq!(find_service(Some("Nominatim")).unwrap().id, "nominatim");
    }

    #[test]
    fn unknown_service_lists_alternatives() {
        let err = find_service(Some("google")).unwrap_err();
        assert!(matches!(
            &err,
            ConfigError::UnknownProvider { id, available }
                if id == "google" && available.contains("opencage")
        ));
    }

    #[test]
    fn opencage_without_key_fails_construction() {
        let service = GeocodingService {
            id: "opencage".to_string(),
            name: "OpenCage".to_string(),
            enabled: true,
            priority: 1,
            provider: ProviderConfig::OpenCage {
                base_url: "https://api.opencagedata.com/geocode/v1/json".to_string(),
                api_key_env: "LOCATION_MAP_TEST_UNSET_REGISTRY_KEY".to_string(),
                language: None,
            },
        };
        assert!(matches!(
            create_provider(&service, reqwest::Client::new()),
            Err(ConfigError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn builds_nominatim_without_key() {
        let service = find_service(Some("nominatim")).unwrap();
        let provider = create_provider(&service, reqwest::Client::new()).unwrap();
        assert_eq!(provider.id(), "nominatim");
    }
}
