use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    #[serde(alias = "lon")]
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn interpolate(self, other: Self, t: f64) -> Self {
        Self {
            lat: self.lat + (other.lat - self.lat) * t,
            lng: self.lng + (other.lng - self.lng) * t,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lng.is_finite()
    }
}

/// How a [`ResolvedLocation`] was obtained.
///
/// `Generated` marks a synthetic point: it is not a real address match and
/// consumers must not present it as one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionType {
    Exact,
    Provided,
    Geocoded,
    Generated,
}

impl ResolutionType {
    pub fn is_real(self) -> bool {
        !matches!(self, ResolutionType::Generated)
    }
}

/// Served to the dashboard as `{lat, lng, address, type, distance, estimatedTime}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "address", alias = "sourceAddress")]
    pub source_address: String,
    #[serde(rename = "type", alias = "resolutionType")]
    pub resolution_type: ResolutionType,
    #[serde(
        rename = "distance",
        alias = "distanceKm",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub distance_km: Option<f64>,
    #[serde(
        rename = "estimatedTime",
        alias = "etaText",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eta_text: Option<String>,
}

impl ResolvedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lng)
    }
}

/// Emergency request as delivered by the dashboard backend. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequestRef {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub brigade_name: String,
    #[serde(default)]
    pub brigade_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEstimateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Coordinate>,
    pub to: Coordinate,
}

/// Served as `{distance, roadDistance, estimatedTime, route}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteEstimate {
    #[serde(rename = "distance", alias = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "roadDistance", alias = "roadDistanceKm")]
    pub road_distance_km: f64,
    pub estimated_time: String,
    pub route: Vec<Coordinate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}
