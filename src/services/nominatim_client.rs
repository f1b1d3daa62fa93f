//! Nominatim (OpenStreetMap) geocoding adapter
//!
//! The default provider: no credential required, but the usage policy
//! caps clients at 1 request per second, enforced here by a token bucket.

use crate::error::{GeocodeError, Result};
use crate::http::{fetch_with_retry, HttpFetch, BASE_RETRY_DELAY, MAX_RETRIES};
use crate::rate_limiter::RateLimiter;
use crate::services::confidence_assessor::{ConfidenceAssessor, ConfidenceSignals};
use crate::services::GeocodeProvider;
use crate::types::{GeocodeOptions, GeocodeResult, GeocodeSource, ProviderKind};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";
// Nominatim usage policy: at most 1 request per second.
const NOMINATIM_MAX_REQUESTS: u32 = 1;
const NOMINATIM_TIME_WINDOW: Duration = Duration::from_secs(1);

/// One entry of a Nominatim search response
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    osm_id: Option<i64>,
    #[serde(default)]
    importance: Option<f64>,
    /// Structured address parts, present with `addressdetails=1`
    #[serde(default)]
    address: Option<Map<String, Value>>,
}

/// Nominatim API client
pub struct NominatimClient {
    fetch: Arc<dyn HttpFetch>,
    rate_limiter: RateLimiter,
    assessor: ConfidenceAssessor,
    base_url: String,
}

impl NominatimClient {
    pub fn new(fetch: Arc<dyn HttpFetch>) -> Self {
        Self {
            fetch,
            rate_limiter: RateLimiter::new(NOMINATIM_MAX_REQUESTS, NOMINATIM_TIME_WINDOW)
                .expect("rate limit constants are non-zero"),
            assessor: ConfidenceAssessor::new(),
            base_url: NOMINATIM_BASE_URL.to_string(),
        }
    }

    fn build_search_url(&self, query: &str, options: &GeocodeOptions) -> String {
        let mut params = url::form_urlencoded::Serializer::new(String::new());
        params.append_pair("q", query);
        params.append_pair("format", "json");
        params.append_pair("limit", &options.limit.to_string());
        params.append_pair("addressdetails", "1");
        if let Some(language) = &options.language {
            params.append_pair("accept-language", language);
        }
        if !options.countries.is_empty() {
            params.append_pair("countrycodes", &options.countries.join(","));
        }
        format!("{}?{}", self.base_url, params.finish())
    }

    fn parse_results(&self, body: &str) -> Result<Vec<GeocodeResult>> {
        let places: Vec<NominatimPlace> = serde_json::from_str(body)
            .map_err(|e| GeocodeError::service_with("failed to parse Nominatim response", e))?;

        places
            .into_iter()
            .map(|place| {
                let latitude = place.lat.parse::<f64>().map_err(|e| {
                    GeocodeError::service_with("invalid latitude in Nominatim response", e)
                })?;
                let longitude = place.lon.parse::<f64>().map_err(|e| {
                    GeocodeError::service_with("invalid longitude in Nominatim response", e)
                })?;

                let signals = ConfidenceSignals {
                    address_fields: place.address.as_ref().map(|a| a.len()),
                    precision: place.importance,
                };
                let confidence = self.assessor.score(ProviderKind::Nominatim, signals);
                let formatted_address = Some(format_address(&place));

                let mut metadata = Map::new();
                if let Some(osm_id) = place.osm_id {
                    metadata.insert("osm_id".into(), osm_id.into());
                }
                if let Some(importance) = place.importance {
                    metadata.insert("importance".into(), importance.into());
                }
                if let Some(address) = place.address {
                    metadata.insert("address".into(), Value::Object(address));
                }

                Ok(GeocodeResult {
                    latitude,
                    longitude,
                    formatted_address,
                    confidence,
                    source: GeocodeSource::Nominatim,
                    metadata,
                })
            })
            .collect()
    }
}

/// Compose city ‖ town ‖ village, state, country; fall back to the raw
/// display name when no structured parts are present.
fn format_address(place: &NominatimPlace) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(address) = &place.address {
        let locality = ["city", "town", "village"]
            .iter()
            .find_map(|key| address.get(*key).and_then(Value::as_str));
        if let Some(locality) = locality {
            parts.push(locality);
        }
        if let Some(state) = address.get("state").and_then(Value::as_str) {
            parts.push(state);
        }
        if let Some(country) = address.get("country").and_then(Value::as_str) {
            parts.push(country);
        }
    }
    if parts.is_empty() {
        place.display_name.clone()
    } else {
        parts.join(", ")
    }
}

#[async_trait]
impl GeocodeProvider for NominatimClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Nominatim
    }

    async fn resolve(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeocodeResult>> {
        let url = self.build_search_url(query, options);
        tracing::debug!(query, "querying Nominatim");

        let response = fetch_with_retry(
            self.fetch.as_ref(),
            &self.rate_limiter,
            &url,
            options.max_retries.unwrap_or(MAX_RETRIES),
            BASE_RETRY_DELAY,
        )
        .await?;

        let results = self.parse_results(&response.body)?;
        tracing::debug!(query, count = results.len(), "Nominatim results mapped");
        Ok(results)
    }
}
