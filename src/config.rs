//! Configuration for the geocoding service
//!
//! Credentials and tunables resolve with ENV > TOML > built-in default
//! priority. Only the Mapbox public token has a built-in default; every
//! other credential must come from the caller.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Public default access token for Mapbox, the one credential that ships
/// with the crate. Override via config or `GEORESOLVE_MAPBOX_ACCESS_TOKEN`.
pub const DEFAULT_MAPBOX_PUBLIC_TOKEN: &str =
    "pk.eyJ1IjoiZ2VvcmVzb2x2ZSIsImEiOiJkZW1vIn0.public-demo-token";

const ENV_GOOGLE_API_KEY: &str = "GEORESOLVE_GOOGLE_API_KEY";
const ENV_MAPBOX_ACCESS_TOKEN: &str = "GEORESOLVE_MAPBOX_ACCESS_TOKEN";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodingConfig {
    /// Google Maps API key; Google is only selectable when present (here
    /// or per request)
    pub google_api_key: Option<String>,
    /// Mapbox access token; falls back to the public default
    pub mapbox_access_token: Option<String>,
    /// User-Agent sent on every outbound request
    pub user_agent: String,
    /// Transport-level timeout per HTTP request, in milliseconds
    pub request_timeout_ms: u64,
    /// Result cache entry lifetime, in seconds
    pub cache_ttl_secs: u64,
    /// Result cache capacity bound, in entries
    pub cache_capacity: usize,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            mapbox_access_token: None,
            user_agent: format!(
                "georesolve/{} (https://github.com/georesolve/georesolve)",
                env!("CARGO_PKG_VERSION")
            ),
            request_timeout_ms: 30_000,
            cache_ttl_secs: 60 * 60,
            cache_capacity: 512,
        }
    }
}

impl GeocodingConfig {
    /// Load configuration: TOML file (when given) with env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(ENV_GOOGLE_API_KEY) {
            if !key.trim().is_empty() {
                if self.google_api_key.is_some() {
                    warn!(
                        "Google API key found in both config file and {}; using environment",
                        ENV_GOOGLE_API_KEY
                    );
                }
                self.google_api_key = Some(key);
            }
        }
        if let Ok(token) = std::env::var(ENV_MAPBOX_ACCESS_TOKEN) {
            if !token.trim().is_empty() {
                if self.mapbox_access_token.is_some() {
                    warn!(
                        "Mapbox token found in both config file and {}; using environment",
                        ENV_MAPBOX_ACCESS_TOKEN
                    );
                }
                self.mapbox_access_token = Some(token);
            }
        }
    }

    /// Effective Mapbox token: configured value or the public default.
    pub fn mapbox_token(&self) -> &str {
        self.mapbox_access_token
            .as_deref()
            .unwrap_or(DEFAULT_MAPBOX_PUBLIC_TOKEN)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
