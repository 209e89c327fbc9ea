//! External places provider abstraction
//!
//! The proximity search consults a third-party places API alongside the
//! technician directory. Implementations:
//! - `HttpPlacesClient` for a real nearby-search endpoint
//! - `MockPlacesProvider` for tests and development (deterministic, no
//!   network)
//!
//! Selection happens in `create_places_provider`: an HTTP client when
//! `PLACES_API_URL` is configured, the mock otherwise.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::types::Coordinates;

/// One candidate business from the external source
#[derive(Debug, Clone)]
pub struct PlaceResult {
    pub place_id: String,
    pub name: String,
    pub vicinity: String,
    pub location: Coordinates,
    pub rating: Option<f64>,
}

/// Places provider trait - abstraction for all nearby-search backends
#[async_trait]
pub trait PlacesProvider: Send + Sync {
    /// Search businesses matching `keyword` within `radius_meters` of
    /// `center`. An empty keyword matches any business.
    async fn search_nearby(
        &self,
        keyword: &str,
        center: Coordinates,
        radius_meters: u32,
    ) -> Result<Vec<PlaceResult>>;

    /// Get the name of this provider implementation
    fn name(&self) -> &'static str;
}

/// Select the provider implementation from configuration
pub fn create_places_provider(config: &Config) -> Box<dyn PlacesProvider> {
    match &config.places_api_url {
        Some(url) => Box::new(HttpPlacesClient::new(
            url,
            config.places_api_key.as_deref().unwrap_or(""),
        )),
        None => Box::new(MockPlacesProvider::new()),
    }
}

// ==========================================================================
// HTTP client
// ==========================================================================

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    #[serde(default)]
    results: Vec<NearbyResult>,
}

#[derive(Debug, Deserialize)]
struct NearbyResult {
    place_id: String,
    name: Option<String>,
    vicinity: Option<String>,
    rating: Option<f64>,
    geometry: NearbyGeometry,
}

#[derive(Debug, Deserialize)]
struct NearbyGeometry {
    location: NearbyLocation,
}

#[derive(Debug, Deserialize)]
struct NearbyLocation {
    lat: f64,
    lng: f64,
}

/// Nearby-search client for a Places-style HTTP API
pub struct HttpPlacesClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpPlacesClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("Fixlink/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        }
    }
}

#[async_trait]
impl PlacesProvider for HttpPlacesClient {
    async fn search_nearby(
        &self,
        keyword: &str,
        center: Coordinates,
        radius_meters: u32,
    ) -> Result<Vec<PlaceResult>> {
        let url = format!(
            "{}/nearbysearch/json?keyword={}&location={},{}&radius={}&key={}",
            self.base_url,
            urlencoding::encode(keyword),
            center.lat,
            center.lng,
            radius_meters,
            self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send places request")?;

        if !response.status().is_success() {
            anyhow::bail!("Places API returned status {}", response.status());
        }

        let body: NearbySearchResponse = response
            .json()
            .await
            .context("Failed to parse places response")?;

        Ok(body
            .results
            .into_iter()
            .map(|r| PlaceResult {
                place_id: r.place_id,
                name: r.name.unwrap_or_else(|| "Unknown Business".to_string()),
                vicinity: r
                    .vicinity
                    .unwrap_or_else(|| "Location not available".to_string()),
                location: Coordinates {
                    lat: r.geometry.location.lat,
                    lng: r.geometry.location.lng,
                },
                rating: r.rating,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

// ==========================================================================
// Mock provider
// ==========================================================================

/// Deterministic provider for tests: returns a fixed pair of businesses
/// offset slightly from the search center.
pub struct MockPlacesProvider {
    fail: bool,
}

impl MockPlacesProvider {
    pub fn new() -> Self {
        Self { fail: false }
    }

    /// A provider whose every call errors, for degradation tests
    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockPlacesProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlacesProvider for MockPlacesProvider {
    async fn search_nearby(
        &self,
        keyword: &str,
        center: Coordinates,
        _radius_meters: u32,
    ) -> Result<Vec<PlaceResult>> {
        if self.fail {
            anyhow::bail!("mock provider failure");
        }

        let label = if keyword.is_empty() { "Service" } else { keyword };
        Ok(vec![
            PlaceResult {
                place_id: "mock-place-1".to_string(),
                name: format!("{} Depot", label),
                vicinity: "1 Mock Street".to_string(),
                location: Coordinates {
                    lat: center.lat + 0.01,
                    lng: center.lng + 0.01,
                },
                rating: Some(4.2),
            },
            PlaceResult {
                place_id: "mock-place-2".to_string(),
                name: format!("{} Works", label),
                vicinity: "2 Mock Avenue".to_string(),
                location: Coordinates {
                    lat: center.lat - 0.02,
                    lng: center.lng + 0.015,
                },
                rating: None,
            },
        ])
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CENTER: Coordinates = Coordinates {
        lat: -26.2041,
        lng: 28.0473,
    };

    #[tokio::test]
    async fn mock_provider_is_deterministic() {
        let provider = MockPlacesProvider::new();

        let a = provider.search_nearby("plumber", CENTER, 10_000).await.unwrap();
        let b = provider.search_nearby("plumber", CENTER, 10_000).await.unwrap();

        assert_eq!(a.len(), 2);
        assert_eq!(a[0].place_id, b[0].place_id);
        assert_eq!(a[0].location, b[0].location);
    }

    #[tokio::test]
    async fn mock_provider_uses_keyword_in_names() {
        let provider = MockPlacesProvider::new();
        let results = provider.search_nearby("electrician", CENTER, 5_000).await.unwrap();
        assert!(results[0].name.contains("electrician"));
    }

    #[tokio::test]
    async fn failing_provider_errors() {
        let provider = MockPlacesProvider::failing();
        assert!(provider.search_nearby("", CENTER, 5_000).await.is_err());
    }

    #[test]
    fn nearby_response_parses_with_missing_fields() {
        let json = r#"{
            "results": [
                {
                    "place_id": "abc",
                    "geometry": {"location": {"lat": -26.1, "lng": 28.1}}
                }
            ]
        }"#;

        let parsed: NearbySearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.results.len(), 1);
        assert!(parsed.results[0].name.is_none());
        assert!(parsed.results[0].rating.is_none());
    }
}
