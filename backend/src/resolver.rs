//! Emergency location resolution.
//!
//! A request is placed by trying the exact gazetteer match, the coordinates
//! supplied with the request, and the multi-provider geocoder, in the order
//! given by [`Precedence`]. The first stage that produces a point wins. When
//! none does, a random point near the branch is generated, so resolution
//! always yields a location; callers tell real from synthetic points by
//! [`ResolutionType`].

use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::AppConfig;
use crate::error::ServiceError;
use crate::fallback::{FallbackConfig, generate_point};
use crate::gazetteer::Gazetteer;
use crate::geocoder::Geocoder;
use crate::models::{
    Coordinate, EmergencyRequestRef, ResolutionType, ResolvedLocation, SRI_LANKA_BOUNDS,
};
use crate::routing::distance_and_eta;

/// Which source is trusted first when a request carries its own coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Precedence {
    /// Exact match, then provided coordinates, then geocoding.
    #[default]
    GazetteerFirst,
    /// Provided coordinates, then exact match, then geocoding.
    ProvidedFirst,
}

impl Precedence {
    pub fn stages(self) -> [ResolutionStage; 3] {
        match self {
            Precedence::GazetteerFirst => [
                ResolutionStage::Exact,
                ResolutionStage::Provided,
                ResolutionStage::Geocode,
            ],
            Precedence::ProvidedFirst => [
                ResolutionStage::Provided,
                ResolutionStage::Exact,
                ResolutionStage::Geocode,
            ],
        }
    }
}

impl FromStr for Precedence {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "gazetteer-first" | "gazetteer" | "exact-first" => Ok(Precedence::GazetteerFirst),
            "provided-first" | "provided" => Ok(Precedence::ProvidedFirst),
            other => Err(format!(
                "unknown precedence {other:?}, expected gazetteer-first or provided-first"
            )),
        }
    }
}

/// Stages that can fail over to the next; the random fallback always follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Exact,
    Provided,
    Geocode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    Resolved(ResolutionType),
}

pub struct LocationResolver {
    gazetteer: Arc<Gazetteer>,
    geocoder: Geocoder,
    fallback: FallbackConfig,
    precedence: Precedence,
    rng: Mutex<StdRng>,
}

impl LocationResolver {
    pub fn new(gazetteer: Arc<Gazetteer>, geocoder: Geocoder, fallback: FallbackConfig) -> Self {
        Self {
            gazetteer,
            geocoder,
            fallback,
            precedence: Precedence::default(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        let gazetteer = match &config.gazetteer_path {
            Some(path) => {
                let gazetteer = Gazetteer::from_file(path)?;
                tracing::info!("Loaded {} gazetteer entries from {:?}", gazetteer.len(), path);
                gazetteer
            }
            None => Gazetteer::builtin(),
        };
        let geocoder = Geocoder::from_config(&config.geocoder)?.with_reference(config.branch);
        let fallback = FallbackConfig {
            reference: config.branch,
            max_radius_km: config.fallback_radius_km,
            bounds: SRI_LANKA_BOUNDS,
        };
        Ok(Self::new(Arc::new(gazetteer), geocoder, fallback).with_precedence(config.precedence))
    }

    pub fn with_precedence(mut self, precedence: Precedence) -> Self {
        self.precedence = precedence;
        self
    }

    pub fn with_geocoder(mut self, geocoder: Geocoder) -> Self {
        self.geocoder = geocoder;
        self
    }

    /// Makes fallback points reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn branch(&self) -> Coordinate {
        self.fallback.reference
    }

    pub fn fallback_radius_km(&self) -> f64 {
        self.fallback.max_radius_km
    }

    pub fn precedence(&self) -> Precedence {
        self.precedence
    }

    pub fn gazetteer(&self) -> &Gazetteer {
        &self.gazetteer
    }

    /// Places the request. Never fails: the last resort is a generated point.
    pub async fn resolve(&self, request: &EmergencyRequestRef) -> ResolvedLocation {
        let address = request.brigade_location.trim();

        for stage in self.precedence.stages() {
            tracing::debug!("Request {}: trying {:?} stage", request.id, stage);
            let found = match stage {
                ResolutionStage::Exact => self
                    .gazetteer
                    .lookup(address)
                    .map(|hit| (hit.coordinate, ResolutionType::Exact)),
                ResolutionStage::Provided => {
                    provided_coordinate(request).map(|coord| (coord, ResolutionType::Provided))
                }
                ResolutionStage::Geocode => self
                    .geocoder
                    .geocode(address)
                    .await
                    .map(|candidate| (candidate.coordinate(), ResolutionType::Geocoded)),
            };
            if let Some((coordinate, kind)) = found {
                return self.located(request, coordinate, kind);
            }
        }

        let generated = self.generate_point();
        self.located(request, generated, ResolutionType::Generated)
    }

    fn generate_point(&self) -> Coordinate {
        match self.rng.lock() {
            Ok(mut rng) => generate_point(&self.fallback, &mut *rng),
            Err(poisoned) => generate_point(&self.fallback, &mut *poisoned.into_inner()),
        }
    }

    fn located(
        &self,
        request: &EmergencyRequestRef,
        coordinate: Coordinate,
        kind: ResolutionType,
    ) -> ResolvedLocation {
        let (distance_km, eta_text) = match distance_and_eta(self.branch(), coordinate) {
            Ok((distance, eta)) => (Some(distance), Some(eta)),
            Err(err) => {
                tracing::warn!("Request {}: no distance estimate: {err}", request.id);
                (None, None)
            }
        };
        let eta = eta_text
            .as_deref()
            .map(|eta| format!(", ETA {eta}"))
            .unwrap_or_default();
        if kind.is_real() {
            tracing::info!(
                "Request {} resolved as {:?} at ({:.5}, {:.5}){eta}",
                request.id,
                kind,
                coordinate.lat,
                coordinate.lng
            );
        } else {
            tracing::warn!(
                "Request {}: could not place {:?}, using a generated point ({:.5}, {:.5}) within {}km{eta}",
                request.id,
                request.brigade_location,
                coordinate.lat,
                coordinate.lng,
                self.fallback_radius_km()
            );
        }
        ResolvedLocation {
            lat: coordinate.lat,
            lng: coordinate.lng,
            source_address: request.brigade_location.clone(),
            resolution_type: kind,
            distance_km,
            eta_text,
        }
    }
}

/// The request's own coordinates, if usable.
fn provided_coordinate(request: &EmergencyRequestRef) -> Option<Coordinate> {
    let coord = request.coordinates?;
    if coord.is_finite() && SRI_LANKA_BOUNDS.contains(coord) {
        Some(coord)
    } else {
        tracing::warn!(
            "Request {}: ignoring provided coordinates ({}, {}) outside the service area",
            request.id,
            coord.lat,
            coord.lng
        );
        None
    }
}

/// Resolution state for one view of one request.
///
/// Asking again for the same request id returns the held result without
/// re-running any stage; a different id starts over.
#[derive(Debug)]
pub struct LocationSession {
    request_id: Option<String>,
    state: ResolutionState,
    location: Option<ResolvedLocation>,
}

impl Default for LocationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LocationSession {
    pub fn new() -> Self {
        Self {
            request_id: None,
            state: ResolutionState::Unresolved,
            location: None,
        }
    }

    pub fn state(&self) -> ResolutionState {
        self.state
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn location(&self) -> Option<&ResolvedLocation> {
        self.location.as_ref()
    }

    pub async fn resolve(
        &mut self,
        resolver: &LocationResolver,
        request: &EmergencyRequestRef,
    ) -> ResolvedLocation {
        if self.request_id.as_deref() == Some(request.id.as_str()) {
            if let Some(location) = &self.location {
                return location.clone();
            }
        }

        self.request_id = Some(request.id.clone());
        self.location = None;
        self.state = ResolutionState::Resolving;

        let location = resolver.resolve(request).await;
        self.state = ResolutionState::Resolved(location.resolution_type);
        self.location = Some(location.clone());
        location
    }
}

struct CachedLocation {
    coordinates: Option<Coordinate>,
    location: ResolvedLocation,
}

/// Resolved locations by request id, shared by the HTTP handlers.
pub struct LocationCache {
    entries: Mutex<LruCache<String, CachedLocation>>,
}

impl LocationCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Cached location for the request, unless its address or coordinates
    /// have changed since it was resolved.
    pub fn get(&self, request: &EmergencyRequestRef) -> Option<ResolvedLocation> {
        let mut entries = self.entries.lock().ok()?;
        let cached = entries.get(&request.id)?;
        if cached.location.source_address == request.brigade_location
            && cached.coordinates == request.coordinates
        {
            tracing::debug!("Location cache hit for request {}", request.id);
            Some(cached.location.clone())
        } else {
            tracing::debug!("Request {} changed since it was cached", request.id);
            None
        }
    }

    pub fn insert(&self, request: &EmergencyRequestRef, location: ResolvedLocation) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                request.id.clone(),
                CachedLocation {
                    coordinates: request.coordinates,
                    location,
                },
            );
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
