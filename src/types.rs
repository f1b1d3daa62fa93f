//! Core data types: queries, options, results, provider identifiers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A geocoding backend that can serve queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenStreetMap Nominatim (no credential required, default fallback)
    Nominatim,
    /// Google Maps Geocoding API (API key required)
    Google,
    /// Mapbox Geocoding API (access token, public default available)
    Mapbox,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Nominatim => "nominatim",
            ProviderKind::Google => "google",
            ProviderKind::Mapbox => "mapbox",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nominatim" => Ok(ProviderKind::Nominatim),
            "google" => Ok(ProviderKind::Google),
            "mapbox" => Ok(ProviderKind::Mapbox),
            other => Err(format!(
                "unknown provider '{other}' (expected nominatim, google, or mapbox)"
            )),
        }
    }
}

/// Where a result came from: a provider, or the local synthetic fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocodeSource {
    Nominatim,
    Google,
    Mapbox,
    /// Deterministic placeholder generated when every provider failed
    Synthetic,
}

impl GeocodeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeocodeSource::Nominatim => "nominatim",
            GeocodeSource::Google => "google",
            GeocodeSource::Mapbox => "mapbox",
            GeocodeSource::Synthetic => "synthetic",
        }
    }

    /// True for results generated locally rather than by a provider
    pub fn is_synthetic(&self) -> bool {
        matches!(self, GeocodeSource::Synthetic)
    }
}

impl From<ProviderKind> for GeocodeSource {
    fn from(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Nominatim => GeocodeSource::Nominatim,
            ProviderKind::Google => GeocodeSource::Google,
            ProviderKind::Mapbox => GeocodeSource::Mapbox,
        }
    }
}

impl fmt::Display for GeocodeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature categories a query can be restricted to (Mapbox vocabulary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceType {
    Country,
    Region,
    Postcode,
    District,
    Place,
    Locality,
    Neighborhood,
    Address,
    Poi,
}

impl PlaceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceType::Country => "country",
            PlaceType::Region => "region",
            PlaceType::Postcode => "postcode",
            PlaceType::District => "district",
            PlaceType::Place => "place",
            PlaceType::Locality => "locality",
            PlaceType::Neighborhood => "neighborhood",
            PlaceType::Address => "address",
            PlaceType::Poi => "poi",
        }
    }
}

/// Resolution options accompanying a query
///
/// Serialized canonically (derive order) into the cache key, so two
/// requests share a cache entry only when every semantic field matches.
/// `force_fresh` is a cache directive rather than a semantic parameter and
/// is excluded from the serialization.
#[derive(Debug, Clone, Serialize)]
pub struct GeocodeOptions {
    /// Provider to use when specified and enabled; falls back otherwise
    pub preferred_provider: Option<ProviderKind>,
    /// Request-scoped credential for the preferred provider
    pub api_key: Option<String>,
    /// Maximum results returned (default 5)
    pub limit: usize,
    /// Feature type filters (empty = provider default)
    pub types: Vec<PlaceType>,
    /// ISO 3166-1 alpha-2 country filters
    pub countries: Vec<String>,
    /// BCP47 language tag for result localization
    pub language: Option<String>,
    /// Overall resolution deadline (default 5s)
    pub timeout: Option<Duration>,
    /// Bypass the cache for this call
    #[serde(skip)]
    pub force_fresh: bool,
    /// Per-attempt retry budget override (default 3)
    pub max_retries: Option<u32>,
}

impl Default for GeocodeOptions {
    fn default() -> Self {
        Self {
            preferred_provider: None,
            api_key: None,
            limit: 5,
            types: Vec::new(),
            countries: Vec::new(),
            language: None,
            timeout: None,
            force_fresh: false,
            max_retries: None,
        }
    }
}

/// One candidate location
///
/// `confidence` is assigned once by the confidence assessor when the
/// adapter maps the provider response; nothing mutates a result after
/// that. `metadata` is provider-specific payload preserved verbatim and
/// never interpreted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// WGS84 latitude in degrees
    pub latitude: f64,
    /// WGS84 longitude in degrees
    pub longitude: f64,
    /// Best-effort human-readable address
    pub formatted_address: Option<String>,
    /// Normalized reliability score in [0, 1]
    pub confidence: f64,
    pub source: GeocodeSource,
    /// Opaque provider payload, passed through untouched
    #[serde(default)]
    pub metadata: Map<String, Value>,
}
