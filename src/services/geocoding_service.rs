//! Resolution orchestrator
//!
//! The façade callers use: checks the cache, races the selected provider
//! adapters under a deadline, filters and ranks by confidence, writes the
//! cache, and degrades to a deterministic synthetic result when no
//! provider delivers. Individual provider failures are absorbed here;
//! the only error `resolve` surfaces is `InvalidRequest`.

use crate::cache::ResultCache;
use crate::config::GeocodingConfig;
use crate::error::{GeocodeError, Result};
use crate::http::{HttpFetch, ReqwestFetch};
use crate::services::{
    GeocodeProvider, GoogleMapsClient, MapboxClient, NominatimClient,
};
use crate::types::{GeocodeOptions, GeocodeResult, GeocodeSource, ProviderKind};
use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Map;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Overall resolution deadline when the caller does not override it
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
/// Results scoring below this are dropped before ranking
pub const MIN_CONFIDENCE: f64 = 0.3;
/// Confidence assigned to the synthetic fallback
pub const SYNTHETIC_CONFIDENCE: f64 = 0.1;

/// Multi-provider geocoding resolution service
///
/// Owns its cache and provider adapters (each adapter owns its rate
/// limiter); construct one instance per process, or one per test case.
pub struct GeocodingService {
    cache: ResultCache,
    providers: Vec<Arc<dyn GeocodeProvider>>,
}

impl GeocodingService {
    /// Build a service with the default `reqwest`-backed fetcher.
    pub fn new(config: GeocodingConfig) -> Result<Self> {
        let fetch: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::new(
            &config.user_agent,
            config.request_timeout(),
        )?);
        Ok(Self::with_fetcher(config, fetch))
    }

    /// Build a service over an injected fetch capability (tests).
    pub fn with_fetcher(config: GeocodingConfig, fetch: Arc<dyn HttpFetch>) -> Self {
        let providers: Vec<Arc<dyn GeocodeProvider>> = vec![
            Arc::new(NominatimClient::new(fetch.clone())),
            Arc::new(GoogleMapsClient::new(
                fetch.clone(),
                config.google_api_key.clone(),
            )),
            Arc::new(MapboxClient::new(fetch, config.mapbox_token().to_string())),
        ];

        Self {
            cache: ResultCache::with_settings(config.cache_ttl(), config.cache_capacity),
            providers,
        }
    }

    /// Resolve a free-text place query into ranked candidates.
    ///
    /// Returns the highest-confidence candidates first, truncated to
    /// `options.limit`. Always yields at least one result for a
    /// non-empty query: when every provider fails (or the deadline
    /// elapses first) the single result is the synthetic fallback,
    /// detectable via `source == GeocodeSource::Synthetic`.
    ///
    /// # Errors
    /// `InvalidRequest` for an empty or whitespace-only query. No other
    /// error escapes.
    pub async fn resolve(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeocodeResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(GeocodeError::InvalidRequest(
                "query cannot be empty".into(),
            ));
        }

        let providers = self.select_providers(options);
        let cache_key = cache_key(query, options, &providers);

        if !options.force_fresh {
            if let Some(results) = self.cache.get(&cache_key).await {
                debug!(query, "cache hit");
                return Ok(results);
            }
        }

        let deadline = options.timeout.unwrap_or(DEFAULT_TIMEOUT);
        let raced =
            tokio::time::timeout(deadline, self.race_providers(query, options, &providers))
                .await;

        let results = match raced {
            Ok(Some(results)) => results,
            Ok(None) => {
                warn!(query, "all providers failed, returning synthetic result");
                return Ok(vec![synthetic_result(query)]);
            }
            Err(_) => {
                warn!(
                    query,
                    timeout_ms = deadline.as_millis() as u64,
                    "geocoding timed out, returning synthetic result"
                );
                return Ok(vec![synthetic_result(query)]);
            }
        };

        let mut results: Vec<GeocodeResult> = results
            .into_iter()
            .filter(|r| r.confidence >= MIN_CONFIDENCE)
            .collect();
        if results.is_empty() {
            warn!(query, "no result met the confidence floor");
            return Ok(vec![synthetic_result(query)]);
        }

        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results.truncate(options.limit.max(1));

        self.cache.set(cache_key, results.clone()).await;
        Ok(results)
    }

    /// Pick the provider set for this request: the preferred provider
    /// when specified and enabled, else the default fallback (Nominatim).
    fn select_providers(&self, options: &GeocodeOptions) -> Vec<Arc<dyn GeocodeProvider>> {
        if let Some(preferred) = options.preferred_provider {
            if let Some(provider) = self
                .providers
                .iter()
                .find(|p| p.kind() == preferred && p.is_enabled(options))
            {
                return vec![provider.clone()];
            }
            warn!(
                provider = preferred.as_str(),
                "preferred provider unavailable, falling back to default"
            );
        }

        self.providers
            .iter()
            .filter(|p| p.kind() == ProviderKind::Nominatim)
            .cloned()
            .collect()
    }

    /// Race the providers; first non-empty success wins.
    ///
    /// Losers are signalled through a child `CancellationToken` and never
    /// awaited again. Cancellation is soft: in-flight transport work is
    /// abandoned, not aborted, which can leak pending requests until they
    /// resolve on their own.
    async fn race_providers(
        &self,
        query: &str,
        options: &GeocodeOptions,
        providers: &[Arc<dyn GeocodeProvider>],
    ) -> Option<Vec<GeocodeResult>> {
        let cancel = CancellationToken::new();
        let mut tasks = FuturesUnordered::new();

        for provider in providers {
            let provider = provider.clone();
            let token = cancel.child_token();
            let query = query.to_string();
            let options = options.clone();

            tasks.push(tokio::spawn(async move {
                let kind = provider.kind();
                tokio::select! {
                    _ = token.cancelled() => Err(GeocodeError::Timeout(format!(
                        "{kind} abandoned: race already settled"
                    ))),
                    result = provider.resolve(&query, &options) => result,
                }
            }));
        }

        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(Ok(results)) if !results.is_empty() => {
                    cancel.cancel();
                    return Some(results);
                }
                Ok(Ok(_)) => debug!("provider returned no results"),
                Ok(Err(e)) => warn!(error = %e, "provider failed"),
                Err(e) => warn!(error = %e, "provider task failed to complete"),
            }
        }

        None
    }
}

/// Cache key: normalized query + canonical options + provider set.
fn cache_key(
    query: &str,
    options: &GeocodeOptions,
    providers: &[Arc<dyn GeocodeProvider>],
) -> String {
    let normalized = query
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let options_key = serde_json::to_string(options).unwrap_or_default();
    let provider_key = providers
        .iter()
        .map(|p| p.kind().as_str())
        .collect::<Vec<_>>()
        .join("+");
    format!("{normalized}:{options_key}:{provider_key}")
}

/// Deterministic placeholder for a query no provider could resolve.
///
/// The byte-sum hash maps the query into a bounded latitude/longitude
/// range, so the same input always lands on the same coordinates.
pub fn synthetic_result(query: &str) -> GeocodeResult {
    let hash: u64 = query
        .chars()
        .fold(0u64, |acc, c| acc.wrapping_add(c as u64));

    let mut metadata = Map::new();
    metadata.insert("hash".into(), hash.into());
    metadata.insert(
        "generated_at".into(),
        chrono::Utc::now().to_rfc3339().into(),
    );

    GeocodeResult {
        latitude: 30.0 + (hash % 50) as f64,
        longitude: -120.0 + (hash % 100) as f64,
        formatted_address: Some(format!("Estimated location for: {query}")),
        confidence: SYNTHETIC_CONFIDENCE,
        source: GeocodeSource::Synthetic,
        metadata,
    }
}
