//! Nominatim / `OpenStreetMap` geocoder client.
//!
//! Keyless alternative to `OpenCage`. The public instance has strict usage
//! rules (**1 request per second**, identifying `User-Agent`), so large
//! tables should target a self-hosted instance through `base_url`.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use crate::{GeocodeError, GeocodeProvider, GeocodedAddress};

/// Nominatim free-form search provider.
pub struct NominatimProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimProvider {
    /// Creates a provider for the search endpoint at `base_url`.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.to_owned(),
        }
    }
}

#[async_trait::async_trait]
impl GeocodeProvider for NominatimProvider {
    fn id(&self) -> &str {
        "nominatim"
    }

    async fn geocode(&self, query: &str) -> Result<Option<GeocodedAddress>, GeocodeError> {
        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(GeocodeError::Unauthorized {
                message: "Nominatim refused the request (check the User-Agent)".to_string(),
            });
        }
        if !status.is_success() {
            return Err(GeocodeError::Status {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown error").to_string(),
            });
        }

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses Nominatim JSON response.
fn parse_response(body: &serde_json::Value) -> Result<Option<GeocodedAddress>, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    let lat = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let lon = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    let display_name = first["display_name"].as_str().map(String::from);

    Ok(Some(GeocodedAddress {
        latitude: lat,
        longitude: lon,
        matched_address: display_name,
    }))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "-33.8567844",
            "lon": "151.2152967",
            "display_name": "Sydney Opera House, Bennelong Point, Sydney, Australia"
        }]);
        let result = parse_response(&body).unwrap().unwrap();
        assert!((result.latitude - -33.856_784_4).abs() < 1e-6);
        assert!((result.longitude - 151.215_296_7).abs() < 1e-6);
        assert!(result.matched_address.is_some());
    }

    #[test]
    fn parses_nominatim_empty() {
        let body = serde_json::json!([]);
        assert!(parse_response(&body).unwrap().is_none());
    }

    #[test]
    fn rejects_non_array_body() {
        let body = serde_json::json!({ "error": "bad request" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn sends_free_form_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Bennelong Point, Sydney, Australia"))
            .and(query_param("format", "jsonv2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "lat": "-33.8568", "lon": "151.2153" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let provider = NominatimProvider::new(reqwest::Client::new(), &server.uri());
        let result = provider
            .geocode("Bennelong Point, Sydney, Australia")
            .await
            .unwrap()
            .unwrap();
        assert!((result.latitude - -33.8568).abs() < 1e-9);
    }

    #[tokio::test]
    async fn maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let provider = NominatimProvider::new(reqwest::Client::new(), &server.uri());
        assert!(matches!(
            provider.geocode("anything").await,
            Err(GeocodeError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn forbidden_is_a_permanent_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let provider = NominatimProvider::new(reqwest::Client::new(), &server.uri());
        let err = provider.geocode("anything").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Unauthorized { .. }));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[tokio::test]
    async fn other_client_errors_keep_their_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let provider = NominatimProvider::new(reqwest::Client::new(), &server.uri());
        let err = provider.geocode("anything").await.unwrap_err();
        assert!(matches!(
            &err,
            GeocodeError::Status { status: 400, message } if message == "Bad Request"
        ));
        assert_eq!(err.kind(), ErrorKind::Permanent);
    }

    #[tokio::test]
    async fn server_errors_are_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let provider = NominatimProvider::new(reqwest::Client::new(), &server.uri());
        let err = provider.geocode("anything").await.unwrap_err();
        assert!(matches!(err, GeocodeError::Status { status: 502, .. }));
        assert_eq!(err.kind(), ErrorKind::Transient);
    }
}
