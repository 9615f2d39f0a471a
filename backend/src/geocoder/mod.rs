//! Multi-provider geocoding.
//!
//! Every configured [`GeocodeProvider`] is queried concurrently and all of
//! them are awaited before anything is scored, so latency is bounded by the
//! slowest provider (or its timeout). A failing provider only contributes an
//! empty candidate set; it never aborts the resolution.

pub mod google;
pub mod locationiq;
pub mod nominatim;
pub mod photon;
pub mod scoring;

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::address::{clean_address, query_variants};
use crate::config::GeocoderConfig;
use crate::models::{BoundingBox, COLOMBO_CENTRE, Coordinate, SRI_LANKA_BOUNDS};

pub use google::GoogleProvider;
pub use locationiq::LocationIqProvider;
pub use nominatim::NominatimProvider;
pub use photon::PhotonProvider;
pub use scoring::QueryContext;

/// Results requested from each provider per query.
pub const RESULT_LIMIT: &str = "5";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no API key configured")]
    MissingApiKey,
    #[error("provider rejected the query: {0}")]
    Api(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// A single geocoding hit, normalised from a provider-specific response.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeCandidate {
    pub lat: f64,
    pub lng: f64,
    pub display_name: String,
    /// Provider-reported place class, e.g. `house`, `road`, `suburb`, `city`.
    pub place_type: String,
    pub importance: f64,
    pub provider: &'static str,
    /// Filled in by [`scoring::score_candidate`].
    pub score: f64,
}

impl GeocodeCandidate {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Adapter around one external geocoding API.
///
/// Implementations translate their JSON into [`GeocodeCandidate`]s and report
/// any failure as a [`ProviderError`]; they do not filter or rank.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<GeocodeCandidate>, ProviderError>;
}

pub fn build_http_client(user_agent: &str, timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(user_agent)
        .build()?)
}

/// Sends the request and decodes a 2xx JSON body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Status(status.as_u16()));
    }
    let body = response.text().await?;
    Ok(serde_json::from_str(&body)?)
}

pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

pub struct Geocoder {
    providers: Vec<Box<dyn GeocodeProvider>>,
    timeout: Duration,
    bounds: BoundingBox,
    reference: Coordinate,
}

impl Geocoder {
    pub fn new(providers: Vec<Box<dyn GeocodeProvider>>, timeout: Duration) -> Self {
        Self {
            providers,
            timeout,
            bounds: SRI_LANKA_BOUNDS,
            reference: COLOMBO_CENTRE,
        }
    }

    /// All four providers in scoring tie-break order. Keyed providers without
    /// a key stay in the list and report [`ProviderError::MissingApiKey`].
    pub fn from_config(config: &GeocoderConfig) -> Result<Self, ProviderError> {
        let client = build_http_client(&config.user_agent, config.timeout)?;
        let providers: Vec<Box<dyn GeocodeProvider>> = vec![
            Box::new(NominatimProvider::new(client.clone(), &config.nominatim_url)),
            Box::new(PhotonProvider::new(client.clone(), &config.photon_url)),
            Box::new(LocationIqProvider::new(
                client.clone(),
                &config.locationiq_url,
                config.locationiq_api_key.clone(),
            )),
            Box::new(GoogleProvider::new(
                client,
                &config.google_url,
                config.google_api_key.clone(),
            )),
        ];
        Ok(Self::new(providers, config.timeout))
    }

    /// A geocoder with no providers; every lookup falls through.
    pub fn offline() -> Self {
        Self::new(Vec::new(), Duration::from_secs(1))
    }

    /// Point that proximity scoring measures from.
    pub fn with_reference(mut self, reference: Coordinate) -> Self {
        self.reference = reference;
        self
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Best in-bounds candidate across all providers, or `None`.
    pub async fn geocode(&self, address: &str) -> Option<GeocodeCandidate> {
        let cleaned = clean_address(address);
        let variants = query_variants(&cleaned);
        if variants.is_empty() || self.providers.is_empty() {
            return None;
        }

        let searches = self.providers.iter().map(|provider| {
            let variants = &variants;
            async move {
                let outcome =
                    tokio::time::timeout(self.timeout, search_variants(provider.as_ref(), variants))
                        .await
                        .unwrap_or(Err(ProviderError::Timeout(self.timeout)));
                (provider.name(), outcome)
            }
        });
        let results = join_all(searches).await;

        let in_bounds: Vec<GeocodeCandidate> = collect_successful(results)
            .into_iter()
            .filter(|candidate| self.bounds.contains(candidate.coordinate()))
            .collect();

        let context = QueryContext::new(&cleaned, self.reference);
        let best = scoring::best_candidate(in_bounds, &context)?;
        tracing::debug!(
            "Geocoded {:?} via {} to ({:.5}, {:.5}) score {:.1}: {}",
            cleaned,
            best.provider,
            best.lat,
            best.lng,
            best.score,
            best.display_name
        );
        Some(best)
    }
}

/// Tries each query variant in turn, stopping at the first that yields results.
async fn search_variants(
    provider: &dyn GeocodeProvider,
    variants: &[String],
) -> Result<Vec<GeocodeCandidate>, ProviderError> {
    let mut last_error = None;
    for variant in variants {
        match provider.search(variant).await {
            Ok(candidates) if !candidates.is_empty() => return Ok(candidates),
            Ok(_) => {}
            Err(ProviderError::MissingApiKey) => return Err(ProviderError::MissingApiKey),
            Err(err) => last_error = Some(err),
        }
    }
    match last_error {
        Some(err) => Err(err),
        None => Ok(Vec::new()),
    }
}

/// Flattens provider results, logging and dropping every failure.
pub fn collect_successful(
    results: Vec<(&'static str, Result<Vec<GeocodeCandidate>, ProviderError>)>,
) -> Vec<GeocodeCandidate> {
    let mut candidates = Vec::new();
    for (name, result) in results {
        match result {
            Ok(found) => {
                tracing::debug!("{name} returned {} candidate(s)", found.len());
                candidates.extend(found);
            }
            Err(ProviderError::MissingApiKey) => {
                tracing::debug!("{name} skipped: no API key configured");
            }
            Err(err) => tracing::warn!("{name} geocoding failed: {err}"),
        }
    }
    candidates
}
