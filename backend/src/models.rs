use serde::{Deserialize, Serialize};

pub use shared::{
    ApiError, Coordinate, EmergencyRequestRef, ResolutionType, ResolvedLocation, RouteEstimate,
    RouteEstimateRequest,
};

/// Rough outline of Sri Lanka. Anything outside is treated as a bad match.
pub const SRI_LANKA_BOUNDS: BoundingBox = BoundingBox {
    min_lat: 5.5,
    max_lat: 10.0,
    min_lng: 79.0,
    max_lng: 82.0,
};

/// Colombo city centre, used as the scoring anchor for geocoder results.
pub const COLOMBO_CENTRE: Coordinate = Coordinate::new(6.9271, 79.8612);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.lat >= self.min_lat
            && coord.lat <= self.max_lat
            && coord.lng >= self.min_lng
            && coord.lng <= self.max_lng
    }

    pub fn clamp(&self, coord: Coordinate) -> Coordinate {
        Coordinate {
            lat: coord.lat.clamp(self.min_lat, self.max_lat),
            lng: coord.lng.clamp(self.min_lng, self.max_lng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_contain_colombo() {
        assert!(SRI_LANKA_BOUNDS.contains(COLOMBO_CENTRE));
    }

    #[test]
    fn bounds_reject_chennai() {
        assert!(!SRI_LANKA_BOUNDS.contains(Coordinate::new(13.0827, 80.2707)));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert!(SRI_LANKA_BOUNDS.contains(Coordinate::new(5.5, 79.0)));
        assert!(SRI_LANKA_BOUNDS.contains(Coordinate::new(10.0, 82.0)));
    }

    #[test]
    fn clamp_pulls_points_inside() {
        let clamped = SRI_LANKA_BOUNDS.clamp(Coordinate::new(4.0, 83.5));
        assert_eq!(clamped, Coordinate::new(5.5, 82.0));
        assert!(SRI_LANKA_BOUNDS.contains(clamped));
    }
}
