//! Google Maps geocoding adapter
//!
//! Requires an API key, supplied per request or via configuration; the
//! orchestrator only selects this provider when a key is available.
//! Google reports request-level failures in the body `status` field, so
//! mapping inspects it before touching the results.

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

const GOOGLE_BASE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const GOOGLE_MAX_REQUESTS: u32 = 50;
const GOOGLE_TIME_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    status: String,
    #[serde(default)]
    results: Vec<GoogleResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleResult {
    formatted_address: Option<String>,
    geometry: GoogleGeometry,
    place_id: Option<String>,
    #[serde(default)]
    types: Vec<String>,
    #[serde(default)]
    address_components: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct GoogleGeometry {
    location: GoogleLocation,
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GoogleLocation {
    lat: f64,
    lng: f64,
}

/// Google Maps Geocoding API client
pub struct GoogleMapsClient {
    fetch: Arc<dyn HttpFetch>,
    rate_limiter: RateLimiter,
    assessor: ConfidenceAssessor,
    api_key: Option<String>,
    base_url: String,
}

impl GoogleMapsClient {
    pub fn new(fetch: Arc<dyn HttpFetch>, api_key: Option<String>) -> Self {
        Self {
            fetch,
            rate_limiter: RateLimiter::new(GOOGLE_MAX_REQUESTS, GOOGLE_TIME_WINDOW)
                .expect("rate limit constants are non-zero"),
            assessor: ConfidenceAssessor::new(),
            api_key,
            base_url: GOOGLE_BASE_URL.to_string(),
        }
    }

    /// Request-scoped key wins over the configured one.
    fn effective_key<'a>(&'a self, options: &'a GeocodeOptions) -> Option<&'a str> {
        options.api_key.as_deref().or(self.api_key.as_deref())
    }

    fn build_url(&self, query: &str, options: &GeocodeOptions, api_key: &str) -> String {
        let mut params = url::form_urlencoded::Serializer::new(String::new());
        params.append_pair("address", query);
        params.append_pair("key", api_key);
        if let Some(language) = &options.language {
            params.append_pair("language", language);
        }
        format!("{}?{}", self.base_url, params.finish())
    }

    fn parse_results(&self, body: &str) -> Result<Vec<GeocodeResult>> {
        let response: GoogleResponse = serde_json::from_str(body)
            .map_err(|e| GeocodeError::service_with("failed to parse Google response", e))?;

        match response.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            "OVER_QUERY_LIMIT" => {
                return Err(GeocodeError::RateLimit(
                    "Google reported OVER_QUERY_LIMIT".into(),
                ))
            }
            status => {
                let detail = response.error_message.unwrap_or_default();
                return Err(GeocodeError::service(format!(
                    "Google geocoding failed with status {status}: {detail}"
                )));
            }
        }

        let results = response
            .results
            .into_iter()
            .map(|result| {
                let rooftop = result.geometry.location_type.as_deref() == Some("ROOFTOP");
                let signals = ConfidenceSignals {
                    address_fields: (!result.address_components.is_empty())
                        .then_some(result.address_components.len()),
                    precision: Some(if rooftop { 1.0 } else { 0.6 }),
                };
                let confidence = self.assessor.score(ProviderKind::Google, signals);

                let mut metadata = Map::new();
                if let Some(place_id) = result.place_id {
                    metadata.insert("place_id".into(), place_id.into());
                }
                if !result.types.is_empty() {
                    metadata.insert("types".into(), result.types.into());
                }
                if let Some(location_type) = result.geometry.location_type {
                    metadata.insert("location_type".into(), location_type.into());
                }

                GeocodeResult {
                    latitude: result.geometry.location.lat,
                    longitude: result.geometry.location.lng,
                    formatted_address: result.formatted_address,
                    confidence,
                    source: GeocodeSource::Google,
                    metadata,
                }
            })
            .collect();

        Ok(results)
    }
}

#[async_trait]
impl GeocodeProvider for GoogleMapsClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn is_enabled(&self, options: &GeocodeOptions) -> bool {
        self.effective_key(options).is_some()
    }

    async fn resolve(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeocodeResult>> {
        let api_key = self.effective_key(options).ok_or_else(|| {
            GeocodeError::InvalidRequest("Google geocoding requires an API key".into())
        })?;

        let url = self.build_url(query, options, api_key);
        tracing::debug!(query, "querying Google Maps geocoding");

        let response = fetch_with_retry(
            self.fetch.as_ref(),
            &self.rate_limiter,
            &url,
            options.max_retries.unwrap_or(MAX_RETRIES),
            BASE_RETRY_DELAY,
        )
        .await?;

        let results = self.parse_results(&response.body)?;
        tracing::debug!(query, count = results.len(), "Google results mapped");
        Ok(results)
    }
}
