//! georesolve - multi-provider geocoding resolution client
//!
//! Translates free-text place queries into ranked candidate coordinates
//! using Nominatim, Google Maps, or Mapbox, with per-provider token-bucket
//! rate limiting, exponential-backoff retry, a TTL result cache, and a
//! deterministic synthetic fallback so callers always receive at least
//! one candidate.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod rate_limiter;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::config::GeocodingConfig;
pub use crate::error::{GeocodeError, Result};
pub use crate::services::GeocodingService;
pub use crate::types::{
    GeocodeOptions, GeocodeResult, GeocodeSource, PlaceType, ProviderKind,
};
