//! Google Maps Geocoding API. Only queried when an API key is configured.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodeCandidate, GeocodeProvider, ProviderError, endpoint, fetch_json};

pub const DEFAULT_URL: &str = "https://maps.googleapis.com";

pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl GeocodeProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let request = self
            .client
            .get(endpoint(&self.base_url, "maps/api/geocode/json"))
            .query(&[("address", query), ("key", key), ("region", "lk")]);
        let response: GoogleResponse = fetch_json(request).await?;
        response.into_candidates(self.name())
    }
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: String,
    geometry: GoogleGeometry,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

impl GoogleResponse {
    fn into_candidates(self, provider: &'static str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            _ => {
                let detail = match self.error_message {
                    Some(message) => format!("{}: {message}", self.status),
                    None => self.status,
                };
                return Err(ProviderError::Api(detail));
            }
        }

        Ok(self
            .results
            .into_iter()
            .map(|result| GeocodeCandidate {
                lat: result.geometry.location.lat,
                lng: result.geometry.location.lng,
                display_name: result.formatted_address,
                place_type: result.types.into_iter().next().unwrap_or_default(),
                importance: location_type_importance(result.geometry.location_type.as_deref()),
                provider,
                score: 0.0,
            })
            .collect())
    }
}

/// Google has no importance score; precision of the fix stands in for it.
fn location_type_importance(location_type: Option<&str>) -> f64 {
    match location_type {
        Some("ROOFTOP") => 1.0,
        Some("RANGE_INTERPOLATED") => 0.8,
        Some("GEOMETRIC_CENTER") => 0.6,
        Some("APPROXIMATE") => 0.4,
        _ => 0.0,
    }
}
