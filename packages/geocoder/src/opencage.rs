//! `OpenCage` geocoder client.
//!
//! Forward geocoding through `GET /geocode/v1/json?q=...&key=...`. Only the
//! first result is requested (`limit=1`). Annotations are disabled since
//! the coordinates are all the pipeline uses.
//!
//! Status codes map onto [`GeocodeError`] as follows: 401 and 403 are
//! credential problems, 402 is an exhausted quota, 429 is rate limiting,
//! and anything else non-2xx is reported with its status.
//!
//! See <https://opencagedata.com/api>

use crate::{ConfigError, GeocodeError, GeocodeProvider, GeocodedAddress};

/// `OpenCage` API provider.
pub struct OpenCageProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: Option<String>,
}

impl OpenCageProvider {
    /// Creates a provider with an explicit API key.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.to_owned(),
            api_key,
            language: None,
        }
    }

    /// Creates a provider with the API key read from `api_key_env`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingApiKey`] if the variable is unset or
    /// empty.
    pub fn from_env(
        client: reqwest::Client,
        base_url: &str,
        api_key_env: &str,
    ) -> Result<Self, ConfigError> {
        let api_key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey {
                env_var: api_key_env.to_string(),
            })?;
        Ok(Self::new(client, base_url, api_key))
    }

    /// Requests results in the given IETF language tag (e.g., `"en"`).
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }
}

#[async_trait::async_trait]
impl GeocodeProvider for OpenCageProvider {
    fn id(&self) -> &str {
        "opencage"
    }

    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let mut req = self.client.get(&self.base_url).query(&[
            ("q", query),
            ("key", self.api_key.as_str()),
            ("limit", "1"),
            ("no_annotations", "1"),
        ]);

        if let Some(language) = &self.language {
            req = req.query(&[("language", language.as_str())]);
        }

        let resp = req.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let message = error_message(resp).await;
            return Err(match status.as_u16() {
                401 | 403 => GeocodeError::Unauthorized { message },
                402 => GeocodeError::QuotaExceeded,
                429 => GeocodeError::RateLimited,
                code => GeocodeError::Status {
                    status: code,
                    message,
                },
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Pulls `status.message` out of an error body, falling back to the HTTP
/// reason phrase.
async fn error_message(resp: reqwest::Response) -> String {
    let fallback = resp
        .status()
        .canonical_reason()
        .unwrap_or("unknown error")
        .to_string();

    resp.json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|body| {
            body.pointer("/status/message")
                .and_then(serde_json::Value::as_str)
                .map(String::from)
        })
        .unwrap_or(fallback)
}

/// Parses an `OpenCage` JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body
        .get("results")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| GeocodeError::Parse {
            message: "OpenCage response missing 'results' array".to_string(),
        })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first
        .pointer("/geometry/lat")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing geometry.lat in OpenCage result".to_string(),
        })?;

    let lng = first
        .pointer("/geometry/lng")
        .and_then(serde_json::Value::as_f64)
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing geometry.lng in OpenCage result".to_string(),
        })?;

    let formatted = first
        .get("formatted")
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lng,
        matched_address: formatted,
    }))
}
