pub mod address;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gazetteer;
pub mod geocoder;
pub mod models;
pub mod resolver;
pub mod routing;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};

use crate::error::ServiceError;
use crate::models::{
    ApiError, EmergencyRequestRef, ResolvedLocation, RouteEstimate, RouteEstimateRequest,
};
use crate::resolver::{LocationCache, LocationResolver};
use crate::routing::estimate_route;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<LocationResolver>,
    pub cache: Arc<LocationCache>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/emergency/locate", post(locate_handler))
        .route("/api/emergency/route", post(route_handler))
        .route("/api/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

async fn locate_handler(
    State(state): State<AppState>,
    Json(req): Json<EmergencyRequestRef>,
) -> Json<ResolvedLocation> {
    if let Some(location) = state.cache.get(&req) {
        return Json(location);
    }

    tracing::info!(
        "Locating request {} for {:?}: {:?}",
        req.id,
        req.brigade_name,
        req.brigade_location
    );
    let location = state.resolver.resolve(&req).await;
    state.cache.insert(&req, location.clone());
    Json(location)
}

async fn route_handler(
    State(state): State<AppState>,
    Json(req): Json<RouteEstimateRequest>,
) -> Result<Json<RouteEstimate>, (StatusCode, Json<ApiError>)> {
    let from = req.from.unwrap_or_else(|| state.resolver.branch());
    let estimate = estimate_route(from, req.to)
        .map_err(ServiceError::from)
        .map_err(error_response)?;
    tracing::debug!(
        "Route estimate {:.2}km ({}) from ({:.4}, {:.4}) to ({:.4}, {:.4})",
        estimate.road_distance_km,
        estimate.estimated_time,
        from.lat,
        from.lng,
        req.to.lat,
        req.to.lng
    );
    Ok(Json(estimate))
}

async fn health_handler() -> &'static str {
    "ok"
}

fn error_response(err: ServiceError) -> (StatusCode, Json<ApiError>) {
    let status = err.status_code();
    if status.is_server_error() {
        tracing::error!("{err}");
    } else {
        tracing::debug!("Rejected request: {err}");
    }
    (
        status,
        Json(ApiError {
            message: err.to_string(),
        }),
    )
}
