use axum::http::StatusCode;
use thiserror::Error;

use crate::config::ConfigError;
use crate::gazetteer::GazetteerError;
use crate::geocoder::ProviderError;
use crate::routing::EstimateError;

/// Failures that reach the service boundary. Resolution itself never fails;
/// these come from start-up or from invalid route requests.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("gazetteer error: {0}")]
    Gazetteer(#[from] GazetteerError),
    #[error("failed to set up geocoding client: {0}")]
    Geocoder(#[from] ProviderError),
    #[error("invalid route request: {0}")]
    Estimate(#[from] EstimateError),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::Estimate(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
