//! Service components: provider adapters, confidence scoring, and the
//! resolution orchestrator

use crate::error::Result;
use crate::types::{GeocodeOptions, GeocodeResult, ProviderKind};
use async_trait::async_trait;

pub mod confidence_assessor;
pub mod geocoding_service;
pub mod google_client;
pub mod mapbox_client;
pub mod nominatim_client;

pub use confidence_assessor::{ConfidenceAssessor, ConfidenceSignals};
pub use geocoding_service::GeocodingService;
pub use google_client::GoogleMapsClient;
pub use mapbox_client::MapboxClient;
pub use nominatim_client::NominatimClient;

/// A geocoding backend adapter
///
/// Implementations translate the normalized query/options into a provider
/// request, gate every attempt through their own rate limiter, and map
/// the provider response into [`GeocodeResult`]s with confidence filled
/// in. Network/parse failures surface as `Service`, exhausted upstream
/// throttling as `RateLimit`.
#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Whether this provider can serve the request (credentials present).
    fn is_enabled(&self, _options: &GeocodeOptions) -> bool {
        true
    }

    async fn resolve(
        &self,
        query: &str,
        options: &GeocodeOptions,
    ) -> Result<Vec<GeocodeResult>>;
}
