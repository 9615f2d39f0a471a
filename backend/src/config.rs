use std::env::VarError;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use crate::geocoder::{google, locationiq, nominatim, photon};
use crate::models::{COLOMBO_CENTRE, Coordinate, SRI_LANKA_BOUNDS};
use crate::resolver::Precedence;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct GeocoderConfig {
    pub nominatim_url: String,
    pub photon_url: String,
    pub locationiq_url: String,
    pub locationiq_api_key: Option<String>,
    pub google_url: String,
    pub google_api_key: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            nominatim_url: nominatim::DEFAULT_URL.to_string(),
            photon_url: photon::DEFAULT_URL.to_string(),
            locationiq_url: locationiq::DEFAULT_URL.to_string(),
            locationiq_api_key: None,
            google_url: google::DEFAULT_URL.to_string(),
            google_api_key: None,
            timeout: Duration::from_secs(8),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub geocoder: GeocoderConfig,
    /// Reference point for distances, proximity scoring and fallback points.
    pub branch: Coordinate,
    pub fallback_radius_km: f64,
    /// Replaces the built-in gazetteer when set.
    pub gazetteer_path: Option<PathBuf>,
    pub precedence: Precedence,
    pub cache_size: NonZeroUsize,
}

const DEFAULT_USER_AGENT: &str = concat!("aquaroute/", env!("CARGO_PKG_VERSION"));

/// Loads `.env` if present, then reads the process environment.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_config(|key| std::env::var(key))
}

/// Parses configuration from an env-var lookup so tests can pass a map.
pub fn build_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };
    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };
    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };
    let parse_f64 = |var: &str, default: f64| -> Result<f64, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => {
                let value = raw.parse::<f64>().map_err(|e| invalid(var, e.to_string()))?;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(invalid(var, "must be a finite number".to_string()))
                }
            }
        }
    };

    let bind_addr = or_default("BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("BIND_ADDR", e.to_string()))?;

    let timeout_secs = or_default("GEOCODER_TIMEOUT_SECS", "8")
        .parse::<u64>()
        .map_err(|e| invalid("GEOCODER_TIMEOUT_SECS", e.to_string()))?;
    if timeout_secs == 0 {
        return Err(invalid("GEOCODER_TIMEOUT_SECS", "must be at least 1".to_string()));
    }

    let defaults = GeocoderConfig::default();
    let geocoder = GeocoderConfig {
        nominatim_url: or_default("NOMINATIM_URL", &defaults.nominatim_url),
        photon_url: or_default("PHOTON_URL", &defaults.photon_url),
        locationiq_url: or_default("LOCATIONIQ_URL", &defaults.locationiq_url),
        locationiq_api_key: optional("LOCATIONIQ_API_KEY"),
        google_url: or_default("GOOGLE_GEOCODE_URL", &defaults.google_url),
        google_api_key: optional("GOOGLE_MAPS_API_KEY"),
        timeout: Duration::from_secs(timeout_secs),
        user_agent: or_default("GEOCODER_USER_AGENT", &defaults.user_agent),
    };

    let branch = Coordinate::new(
        parse_f64("BRANCH_LAT", COLOMBO_CENTRE.lat)?,
        parse_f64("BRANCH_LNG", COLOMBO_CENTRE.lng)?,
    );
    if !SRI_LANKA_BOUNDS.contains(branch) {
        return Err(invalid(
            "BRANCH_LAT/BRANCH_LNG",
            format!("({}, {}) is outside the service area", branch.lat, branch.lng),
        ));
    }

    let fallback_radius_km = parse_f64("FALLBACK_RADIUS_KM", 10.0)?;
    if fallback_radius_km < 0.0 {
        return Err(invalid("FALLBACK_RADIUS_KM", "must not be negative".to_string()));
    }

    let precedence = match optional("RESOLVER_PRECEDENCE") {
        None => Precedence::default(),
        Some(raw) => raw
            .parse::<Precedence>()
            .map_err(|reason| invalid("RESOLVER_PRECEDENCE", reason))?,
    };

    let cache_size = or_default("LOCATION_CACHE_SIZE", "128")
        .parse::<NonZeroUsize>()
        .map_err(|e| invalid("LOCATION_CACHE_SIZE", e.to_string()))?;

    Ok(AppConfig {
        bind_addr,
        geocoder,
        branch,
        fallback_radius_km,
        gazetteer_path: optional("GAZETTEER_PATH").map(PathBuf::from),
        precedence,
        cache_size,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from_map<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    fn assert_invalid(result: Result<AppConfig, ConfigError>, expected: &str) {
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == expected),
            "expected InvalidEnvVar({expected}), got: {result:?}"
        );
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let map = HashMap::new();
        let cfg = build_config(lookup_from_map(&map)).unwrap();

        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(cfg.geocoder.nominatim_url, "https://nominatim.openstreetmap.org");
        assert_eq!(cfg.geocoder.photon_url, "https://photon.komoot.io");
        assert_eq!(cfg.geocoder.timeout, Duration::from_secs(8));
        assert!(cfg.geocoder.locationiq_api_key.is_none());
        assert!(cfg.geocoder.google_api_key.is_none());
        assert!(cfg.geocoder.user_agent.starts_with("aquaroute/"));
        assert_eq!(cfg.branch, COLOMBO_CENTRE);
        assert_eq!(cfg.fallback_radius_km, 10.0);
        assert!(cfg.gazetteer_path.is_none());
        assert_eq!(cfg.precedence, Precedence::GazetteerFirst);
        assert_eq!(cfg.cache_size.get(), 128);
    }

    #[test]
    fn overrides_are_applied() {
        let map = HashMap::from([
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("NOMINATIM_URL", "http://localhost:7070"),
            ("GOOGLE_MAPS_API_KEY", "abc123"),
            ("GEOCODER_TIMEOUT_SECS", "3"),
            ("BRANCH_LAT", "7.2906"),
            ("BRANCH_LNG", "80.6337"),
            ("FALLBACK_RADIUS_KM", "2.5"),
            ("GAZETTEER_PATH", "/etc/aquaroute/places.json"),
            ("RESOLVER_PRECEDENCE", "provided-first"),
            ("LOCATION_CACHE_SIZE", "16"),
        ]);
        let cfg = build_config(lookup_from_map(&map)).unwrap();

        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.geocoder.nominatim_url, "http://localhost:7070");
        assert_eq!(cfg.geocoder.google_api_key.as_deref(), Some("abc123"));
        assert_eq!(cfg.geocoder.timeout, Duration::from_secs(3));
        assert_eq!(cfg.branch, Coordinate::new(7.2906, 80.6337));
        assert_eq!(cfg.fallback_radius_km, 2.5);
        assert_eq!(
            cfg.gazetteer_path,
            Some(PathBuf::from("/etc/aquaroute/places.json"))
        );
        assert_eq!(cfg.precedence, Precedence::ProvidedFirst);
        assert_eq!(cfg.cache_size.get(), 16);
    }

    #[test]
    fn blank_api_key_is_absent() {
        let map = HashMap::from([("LOCATIONIQ_API_KEY", "   ")]);
        let cfg = build_config(lookup_from_map(&map)).unwrap();
        assert!(cfg.geocoder.locationiq_api_key.is_none());
    }

    #[test]
    fn rejects_bad_values() {
        for (var, value) in [
            ("BIND_ADDR", "nowhere"),
            ("GEOCODER_TIMEOUT_SECS", "0"),
            ("GEOCODER_TIMEOUT_SECS", "soon"),
            ("FALLBACK_RADIUS_KM", "-1"),
            ("FALLBACK_RADIUS_KM", "NaN"),
            ("RESOLVER_PRECEDENCE", "whatever"),
            ("LOCATION_CACHE_SIZE", "0"),
        ] {
            let map = HashMap::from([(var, value)]);
            assert_invalid(build_config(lookup_from_map(&map)), var);
        }
    }

    #[test]
    fn branch_must_be_in_service_area() {
        let map = HashMap::from([("BRANCH_LAT", "51.5"), ("BRANCH_LNG", "-0.12")]);
        assert_invalid(build_config(lookup_from_map(&map)), "BRANCH_LAT/BRANCH_LNG");
    }
}
