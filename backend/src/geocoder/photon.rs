//! Komoot Photon search (GeoJSON responses).

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{GeocodeCandidate, GeocodeProvider, ProviderError, RESULT_LIMIT, endpoint, fetch_json};

pub const DEFAULT_URL: &str = "https://photon.komoot.io";

/// Photon's `bbox` parameter: min lon, min lat, max lon, max lat.
const SRI_LANKA_BBOX: &str = "79.0,5.5,82.0,10.0";

pub struct PhotonProvider {
    client: Client,
    base_url: String,
}

impl PhotonProvider {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GeocodeProvider for PhotonProvider {
    fn name(&self) -> &'static str {
        "photon"
    }

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError> {
        let request = self.client.get(endpoint(&self.base_url, "api")).query(&[
            ("q", query),
            ("limit", RESULT_LIMIT),
            ("lang", "en"),
            ("bbox", SRI_LANKA_BBOX),
        ]);
        let response: PhotonResponse = fetch_json(request).await?;
        Ok(response
            .features
            .into_iter()
            .filter_map(|feature| feature.into_candidate(self.name()))
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct PhotonResponse {
    #[serde(default)]
    features: Vec<PhotonFeature>,
}

#[derive(Debug, Deserialize)]
struct PhotonFeature {
    geometry: PhotonGeometry,
    #[serde(default)]
    properties: PhotonProperties,
}

#[derive(Debug, Deserialize)]
struct PhotonGeometry {
    coordinates: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct PhotonProperties {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    housenumber: Option<String>,
    #[serde(default)]
    street: Option<String>,
    #[serde(default)]
    district: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(rename = "type", default)]
    place_type: Option<String>,
    #[serde(default)]
    osm_value: Option<String>,
}

impl PhotonFeature {
    fn into_candidate(self, provider: &'static str) -> Option<GeocodeCandidate> {
        // GeoJSON order is [lon, lat]
        let (lng, lat) = match self.geometry.coordinates.as_slice() {
            [lng, lat, ..] if lat.is_finite() && lng.is_finite() => (*lng, *lat),
            _ => return None,
        };
        let props = self.properties;
        let street = match (props.housenumber, props.street) {
            (Some(number), Some(street)) => Some(format!("{number} {street}")),
            (None, street) => street,
            (Some(_), None) => None,
        };
        let display_name = [
            props.name,
            street,
            props.district,
            props.city,
            props.postcode,
            props.state,
            props.country,
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ");

        Some(GeocodeCandidate {
            lat,
            lng,
            display_name,
            place_type: props.place_type.or(props.osm_value).unwrap_or_default(),
            importance: 0.0,
            provider,
            score: 0.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_display_name_from_properties() {
        let body = r#"{"features": [
            {"geometry": {"type": "Point", "coordinates": [79.8816, 6.7730]},
             "properties": {"name": "Moratuwa", "city": "Moratuwa", "state": "Western Province",
                            "country": "Sri Lanka", "type": "city", "osm_value": "town"}},
            {"geometry": {"type": "Point", "coordinates": [79.86]},
             "properties": {"name": "Broken"}},
            {"geometry": {"type": "Point", "coordinates": [79.8641, 6.9337]},
             "properties": {"housenumber": "45", "street": "Baseline Road", "postcode": "01000",
                            "osm_value": "house"}}
        ]}"#;
        let response: PhotonResponse = serde_json::from_str(body).unwrap();
        let candidates: Vec<GeocodeCandidate> = response
            .features
            .into_iter()
            .filter_map(|f| f.into_candidate("photon"))
            .collect();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].lat, 6.7730);
        assert_eq!(candidates[0].lng, 79.8816);
        assert_eq!(
            candidates[0].display_name,
            "Moratuwa, Moratuwa, Western Province, Sri Lanka"
        );
        assert_eq!(candidates[0].place_type, "city");
        assert_eq!(candidates[1].display_name, "45 Baseline Road, 01000");
        assert_eq!(candidates[1].place_type, "house");
    }

    #[test]
    fn missing_features_is_empty() {
        let response: PhotonResponse = serde_json::from_str("{}").unwrap();
        assert!(response.features.is_empty());
    }
}
