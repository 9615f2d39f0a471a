use async_trait::async_trait;
use reqwest::Client;

use super::nominatim::{Place, places_to_candidates};
use super::{GeocodeCandidate, GeocodeProvider, ProviderError, RESULT_LIMIT, endpoint, fetch_json};

pub const DEFAULT_URL: &str = "https://us1.locationiq.com";

pub struct LocationIqProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl LocationIqProvider {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }
}

#[async_trait]
impl GeocodeProvider for LocationIqProvider {
    fn name(&self) -> &'static str {
        "locationiq"
    }

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let request = self.client.get(endpoint(&self.base_url, "v1/search")).query(&[
            ("key", key),
            ("q", query),
            ("format", "json"),
            ("countrycodes", "lk"),
            ("limit", RESULT_LIMIT),
        ]);
        let places: Vec<Place> = match fetch_json(request).await {
            Ok(places) => places,
            // LocationIQ answers 404 {"error":"Unable to geocode"} when nothing matches
            Err(ProviderError::Status(404)) => Vec::new(),
            Err(err) => return Err(err),
        };
        Ok(places_to_candidates(places, self.name()))
    }
}
