//! Confidence Assessor
//!
//! Normalizes heterogeneous provider relevance signals into a single
//! [0, 1] confidence used for ranking and filtering. Weighted blend:
//! address completeness (0.4), source reliability (0.3), precision (0.3).

use crate::types::ProviderKind;

/// Structured address fields a fully-detailed result is expected to carry
const EXPECTED_ADDRESS_FIELDS: f64 = 10.0;

/// Raw per-result signals extracted by a provider adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceSignals {
    /// Count of structured address sub-fields present, when the provider
    /// returns a structured address at all
    pub address_fields: Option<usize>,
    /// Provider-reported precision in [0, 1]: Nominatim importance,
    /// Mapbox relevance, or a binary value derived from Google's
    /// location type
    pub precision: Option<f64>,
}

/// Weighted confidence scoring across providers
pub struct ConfidenceAssessor {
    address_weight: f64,
    reliability_weight: f64,
    precision_weight: f64,
}

impl ConfidenceAssessor {
    pub fn new() -> Self {
        Self {
            address_weight: 0.4,
            reliability_weight: 0.3,
            precision_weight: 0.3,
        }
    }

    /// Fixed reliability constant per provider
    fn reliability(kind: ProviderKind) -> f64 {
        match kind {
            ProviderKind::Google => 0.9,
            ProviderKind::Mapbox => 0.85,
            ProviderKind::Nominatim => 0.7,
        }
    }

    /// Blend the signals into a confidence in [0, 1].
    ///
    /// Each sub-score is normalized to [0, 1] before weighting; missing
    /// signals default to 0.5.
    pub fn score(&self, kind: ProviderKind, signals: ConfidenceSignals) -> f64 {
        let address_score = signals
            .address_fields
            .map(|count| (count as f64 / EXPECTED_ADDRESS_FIELDS).min(1.0))
            .unwrap_or(0.5);
        let reliability_score = Self::reliability(kind);
        let precision_score = signals.precision.unwrap_or(0.5).clamp(0.0, 1.0);

        let blended = address_score * self.address_weight
            + reliability_score * self.reliability_weight
            + precision_score * self.precision_weight;
        blended.clamp(0.0, 1.0)
    }
}

impl Default for ConfidenceAssessor {
    fn default() -> Self {
        Self::new()
    }
}
