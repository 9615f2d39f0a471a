use crate::models::{Coordinate, RouteEstimate};

pub const EARTH_RADIUS_KM: f64 = 6_371.0;
/// Roads wind; straight-line distance is inflated by this before estimating time.
pub const ROAD_WINDING_FACTOR: f64 = 1.3;
pub const AVERAGE_SPEED_KMH: f64 = 40.0;

const ROUTE_STEPS: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum EstimateError {
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },
    #[error("travel time must be a finite, non-negative number of hours, got {0}")]
    InvalidDuration(f64),
}

pub fn validate_coordinate(coord: Coordinate) -> Result<Coordinate, EstimateError> {
    let valid = coord.is_finite()
        && (-90.0..=90.0).contains(&coord.lat)
        && (-180.0..=180.0).contains(&coord.lng);
    if valid {
        Ok(coord)
    } else {
        Err(EstimateError::InvalidCoordinate {
            lat: coord.lat,
            lng: coord.lng,
        })
    }
}

pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlng = (dlng / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlng * sin_dlng;
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

pub fn road_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    haversine_km(a, b) * ROAD_WINDING_FACTOR
}

pub fn travel_hours(road_km: f64) -> f64 {
    road_km / AVERAGE_SPEED_KMH
}

/// Formats a duration as `"1h 45m"`, or `"30m"` under one hour.
pub fn format_eta(hours: f64) -> Result<String, EstimateError> {
    if !hours.is_finite() || hours < 0.0 {
        return Err(EstimateError::InvalidDuration(hours));
    }

    let total_minutes = (hours * 60.0).round() as u64;
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    if h > 0 {
        Ok(format!("{h}h {m}m"))
    } else {
        Ok(format!("{m}m"))
    }
}

/// Direct distance plus ETA text for a trip between two points.
pub fn distance_and_eta(from: Coordinate, to: Coordinate) -> Result<(f64, String), EstimateError> {
    let from = validate_coordinate(from)?;
    let to = validate_coordinate(to)?;
    let direct = haversine_km(from, to);
    let eta = format_eta(travel_hours(road_distance_km(from, to)))?;
    Ok((direct, eta))
}

/// Straight polyline between two points for drawing the route line.
pub fn straight_route(from: Coordinate, to: Coordinate) -> Vec<Coordinate> {
    (0..=ROUTE_STEPS)
        .map(|i| from.interpolate(to, i as f64 / ROUTE_STEPS as f64))
        .collect()
}

pub fn estimate_route(from: Coordinate, to: Coordinate) -> Result<RouteEstimate, EstimateError> {
    let (distance_km, estimated_time) = distance_and_eta(from, to)?;
    Ok(RouteEstimate {
        distance_km,
        road_distance_km: road_distance_km(from, to),
        estimated_time,
        route: straight_route(from, to),
    })
}
