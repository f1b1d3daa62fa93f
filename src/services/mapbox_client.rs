//! Mapbox geocoding adapter
//!
//! Uses the `mapbox.places` forward-geocoding endpoint. A public default
//! access token ships with the crate, so this provider is always
//! selectable; callers supply their own token for production traffic.

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
use url::Url;

const MAPBOX_BASE_URL: &str = "https://api.mapbox.com/geocoding/v5/mapbox.places";
// Mapbox geocoding allows 600 requests per minute.
const MAPBOX_MAX_REQUESTS: u32 = 600;
const MAPBOX_TIME_WINDOW: Duration = Duration::from_secs(60);
const DEFAULT_TYPES: &str = "place,address,poi";

#[derive(Debug, Deserialize)]
struct MapboxResponse {
    #[serde(default)]
    features: Vec<MapboxFeature>,
}

#[derive(Debug, Deserialize)]
struct MapboxFeature {
    #[serde(default)]
    id: Option<String>,
    /// [longitude, latitude]
    center: Vec<f64>,
    #[serde(default)]
    place_name: Option<String>,
    #[serde(default)]
    place_type: Vec<String>,
    #[serde(default)]
    relevance: Option<f64>,
    #[serde(default)]
    properties: Option<Value>,
    #[serde(default)]
    context: Option<Value>,
}

/// Mapbox Geocoding API client
pub struct MapboxClient {
    fetch: Arc<dyn HttpFetch>,
    rate_limiter: RateLimiter,
    assessor: ConfidenceAssessor,
    access_token: String,
    base_url: String,
}

impl MapboxClient {
    pub fn new(fetch: Arc<dyn HttpFetch>, access_token: String) -> Self {
        Self {
            fetch,
            rate_limiter: RateLimiter::new(MAPBOX_MAX_REQUESTS, MAPBOX_TIME_WINDOW)
                .expect("rate limit constants are non-zero"),
            assessor: ConfidenceAssessor::new(),
            access_token,
            base_url: MAPBOX_BASE_URL.to_string(),
        }
    }

    fn effective_token<'a>(&'a self, options: &'a GeocodeOptions) -> &'a str {
        options.api_key.as_deref().unwrap_or(&self.access_token)
    }

    fn build_url(&self, query: &str, options: &GeocodeOptions) -> Result<String> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| GeocodeError::service_with("invalid Mapbox base URL", e))?;
        url.path_segments_mut()
            .map_err(|_| GeocodeError::service("Mapbox base URL cannot carry a path"))?
            .push(&format!("{query}.json"));

        let types = if options.types.is_empty() {
            DEFAULT_TYPES.to_string()
        } else {
            options
                .types
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(",")
        };

        {
            let mut params = url.query_pairs_mut();
            params.append_pair("access_token", self.effective_token(options));
            params.append_pair("limit", &options.limit.to_string());
            params.append_pair("types", &types);
            params.append_pair(
                "language",
                options.language.as_deref().unwrap_or("en"),
            );
            if !options.countries.is_empty() {
                params.append_pair("country", &options.countries.join(","));
            }
        }

        Ok(url.into())
    }

    fn parse_results(&self, body: &str) -> Result<Vec<GeocodeResult>> {
        let response: MapboxResponse = serde_json::from_str(body)
            .map_err(|e| GeocodeError::service_with("failed to parse Mapbox response", e))?;

        response
            .features
            .into_iter()
            .map(|feature| {
                let (longitude, latitude) = match feature.center.as_slice() {
                    [lon, lat, ..] => (*lon, *lat),
                    _ => {
                        return Err(GeocodeError::service(
                            "malformed center coordinates in Mapbox feature",
                        ))
                    }
                };

                let context_len = feature
                    .context
                    .as_ref()
                    .and_then(Value::as_array)
                    .map(Vec::len);
                let signals = ConfidenceSignals {
                    address_fields: context_len,
                    precision: feature.relevance,
                };
                let confidence = self.assessor.score(ProviderKind::Mapbox, signals);

                let mut metadata = Map::new();
                if let Some(id) = feature.id {
                    metadata.insert("id".into(), id.into());
                }
                if let Some(place_name) = &feature.place_name {
                    metadata.insert("place_name".into(), place_name.clone().into());
                }
                if !feature.place_type.is_empty() {
                    metadata.insert("place_type".into(), feature.place_type.into());
                }
                if let Some(relevance) = feature.relevance {
                    metadata.insert("relevance".into(), relevance.into());
                }
                if let Some(properties) = feature.properties {
                    metadata.insert("properties".into(), properties);
                }
                if let Some(context) = feature.context {
                    metadata.insert("context".into(), context);
                }

                Ok(GeocodeResult {
                    latitude,
                    longitude,
                    formatted_address: feature.place_name,
                    confidence,
                    source: GeocodeSource::Mapbox,
                    metadata,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GeocodeProvider for MapboxClient {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Mapbox
    }

    async fn resolve(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeocodeResult>> {
        let url = self.build_url(query, options)?;
        tracing::debug!(query, "querying Mapbox geocoding");

        let response = fetch_with_retry(
            self.fetch.as_ref(),
            &self.rate_limiter,
            &url,
            options.max_retries.unwrap_or(MAX_RETRIES),
            BASE_RETRY_DELAY,
        )
        .await?;

        let results = self.parse_results(&response.body)?;
        tracing::debug!(query, count = results.len(), "Mapbox results mapped");
        Ok(results)
    }
}
