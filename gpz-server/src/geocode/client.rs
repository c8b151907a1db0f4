//! Nominatim (OpenStreetMap) geocoding client.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::domain::Coordinate;

use super::Geocoder;
use super::error::GeocodeError;

/// Default base URL for the public Nominatim instance.
const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// One place in a Nominatim search response.
///
/// Nominatim encodes coordinates as strings.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// Configuration for the Nominatim client.
#[derive(Debug, Clone)]
pub struct NominatimConfig {
    /// User-Agent header; Nominatim's usage policy requires one
    pub user_agent: String,
    /// Base URL for the API
    pub base_url: String,
    /// Appended to every query (e.g. a country name) to narrow results
    pub country_suffix: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl NominatimConfig {
    /// Create a new config with the given user agent.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            country_suffix: None,
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Append `suffix` to every query. Blank suffixes are ignored.
    pub fn with_country_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.country_suffix = if suffix.trim().is_empty() {
            None
        } else {
            Some(suffix)
        };
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the Nominatim search API.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    http: reqwest::Client,
    base_url: String,
    country_suffix: Option<String>,
}

impl NominatimClient {
    /// Create a new Nominatim client.
    pub fn new(config: NominatimConfig) -> Result<Self, GeocodeError> {
        if config.user_agent.trim().is_empty() {
            return Err(GeocodeError::NotConfigured(
                "Nominatim requires a User-Agent".to_string(),
            ));
        }

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            country_suffix: config.country_suffix,
        })
    }

    /// The query text sent for `address`.
    fn query_for(&self, address: &str) -> String {
        match &self.country_suffix {
            Some(suffix) => format!("{}, {}", address.trim(), suffix),
            None => address.trim().to_string(),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let url = format!("{}/search", self.base_url);
        let query = self.query_for(address);

        let response = self
            .http
            .get(&url)
            .query(&[
                ("q", query.as_str()),
                ("format", "json"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;

        let places: Vec<NominatimPlace> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Json {
                message: e.to_string(),
            })?;

        let Some(place) = places.into_iter().next() else {
            debug!(%query, "no geocoding match");
            return Ok(None);
        };

        let parse = |raw: &str| {
            raw.trim().parse::<f64>().map_err(|e| GeocodeError::Json {
                message: format!("invalid coordinate '{raw}': {e}"),
            })
        };
        let coordinate = Coordinate::new(parse(&place.lat)?, parse(&place.lon)?).map_err(|e| {
            GeocodeError::Json {
                message: e.to_string(),
            }
        })?;

        debug!(%query, %coordinate, "geocoded address");
        Ok(Some(coordinate))
    }
}
