//! OpenStreetMap Nominatim search.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodeCandidate, GeocodeProvider, ProviderError, RESULT_LIMIT, endpoint, fetch_json};

pub const DEFAULT_URL: &str = "https://nominatim.openstreetmap.org";

pub struct NominatimProvider {
    client: Client,
    base_url: String,
}

impl NominatimProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let request = self.client.get(endpoint(&self.base_url, "search")).query(&[
            ("format", "json"),
            ("q", query),
            ("countrycodes", "lk"),
            ("limit", RESULT_LIMIT),
        ]);
        let places: Vec<Place> = fetch_json(request).await?;
        Ok(places_to_candidates(places, self.name()))
    }
}

/// Nominatim-style search hit; LocationIQ serves the same shape.
#[derive(Debug, Deserialize)]
pub(crate) struct Place {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    importance: Option<f64>,
    #[serde(rename = "type", default)]
    place_type: Option<String>,
    #[serde(default)]
    class: Option<String>,
}

/// Drops hits whose coordinates do not parse.
pub(crate) fn places_to_candidates(places: Vec<Place>, provider: &'static str) -> Vec<GeocodeCandidate> {
    places
        .into_iter()
        .filter_map(|place| {
            let (lat, lng) = match (place.lat.parse::<f64>(), place.lon.parse::<f64>()) {
                (Ok(lat), Ok(lng)) if lat.is_finite() && lng.is_finite() => (lat, lng),
                _ => return None,
            };
            Some(GeocodeCandidate {
                lat,
                lng,
                display_name: place.display_name,
                place_type: place.place_type.or(place.class).unwrap_or_default(),
                importance: place.importance.unwrap_or(0.0),
                provider,
                score: 0.0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_response() {
        let body = r#"[
            {"lat": "6.9147", "lon": "79.8778", "display_name": "Borella, Colombo, Sri Lanka",
             "importance": 0.41, "type": "suburb", "class": "place"},
            {"lat": "bogus", "lon": "79.8", "display_name": "Broken"},
            {"lat": "6.93", "lon": "79.86", "display_name": "No type", "class": "highway"}
        ]"#;
        let places: Vec<Place> = serde_json::from_str(body).unwrap();
        let candidates = places_to_candidates(places, "nominatim");

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].lat, 6.9147);
        assert_eq!(candidates[0].lng, 79.8778);
        assert_eq!(candidates[0].place_type, "suburb");
        assert_eq!(candidates[0].importance, 0.41);
        assert_eq!(candidates[1].place_type, "highway");
        assert_eq!(candidates[1].importance, 0.0);
    }
}
