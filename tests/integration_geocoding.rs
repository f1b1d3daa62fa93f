//! End-to-end resolution scenarios over a scripted fetch capability
//!
//! Timing-sensitive cases run under tokio's paused clock, so backoff and
//! TTL assertions are exact and the suite never sleeps for real.

mod helpers;

use georesolve::{
    GeocodeError, GeocodeOptions, GeocodeSource, GeocodingConfig, GeocodingService,
    ProviderKind,
};
use helpers::MockFetch;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn service(mock: Arc<MockFetch>) -> GeocodingService {
    GeocodingService::with_fetcher(GeocodingConfig::default(), mock)
}

/// A healthy Nominatim body with one entry per `(lat, lon, importance)`.
fn nominatim_body(entries: &[(f64, f64, f64)]) -> serde_json::Value {
    json!(entries
        .iter()
        .map(|(lat, lon, importance)| json!({
            "lat": lat.to_string(),
            "lon": lon.to_string(),
            "display_name": format!("Place at {lat}"),
            "importance": importance,
        }))
        .collect::<Vec<_>>())
}

#[tokio::test]
async fn empty_query_is_rejected() {
    let mock = MockFetch::new();
    let service = service(mock);

    for query in ["", "   ", "\t\n"] {
        let result = service.resolve(query, &GeocodeOptions::default()).await;
        assert!(
            matches!(result, Err(GeocodeError::InvalidRequest(_))),
            "query {query:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn identical_requests_hit_the_cache() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());
    let options = GeocodeOptions::default();

    let first = service.resolve("Paris", &options).await.unwrap();
    let second = service.resolve("Paris", &options).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(mock.calls(), 1, "second call must be served from cache");
}

#[tokio::test]
async fn query_normalization_shares_the_cache_entry() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());
    let options = GeocodeOptions::default();

    service.resolve("Paris  France", &options).await.unwrap();
    service.resolve("  paris france ", &options).await.unwrap();

    assert_eq!(mock.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn expired_cache_entries_trigger_a_fresh_lookup() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());
    let options = GeocodeOptions::default();

    service.resolve("Paris", &options).await.unwrap();
    assert_eq!(mock.calls(), 1);

    // Just inside the TTL: still cached.
    tokio::time::sleep(Duration::from_secs(3599)).await;
    service.resolve("Paris", &options).await.unwrap();
    assert_eq!(mock.calls(), 1);

    // Past the TTL: the provider is consulted again.
    tokio::time::sleep(Duration::from_secs(2)).await;
    service.resolve("Paris", &options).await.unwrap();
    assert_eq!(mock.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn force_fresh_bypasses_the_cache() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());
    let options = GeocodeOptions {
        force_fresh: true,
        ..Default::default()
    };

    service.resolve("Paris", &options).await.unwrap();
    service.resolve("Paris", &options).await.unwrap();

    assert_eq!(mock.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn distinct_options_use_distinct_cache_entries() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());

    service
        .resolve(
            "Paris",
            &GeocodeOptions {
                limit: 5,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    service
        .resolve(
            "Paris",
            &GeocodeOptions {
                limit: 10,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(mock.calls(), 2, "limit is part of the cache key");
}

#[tokio::test]
async fn low_confidence_results_are_filtered_out() {
    let mock = MockFetch::new();
    // First entry: importance 0 and a single address field scores 0.25,
    // below the 0.3 floor. Second: five fields and importance 0.9 → 0.68.
    mock.respond_json(
        "nominatim",
        200,
        &json!([
            {
                "lat": "1.0", "lon": "1.0", "display_name": "weak",
                "importance": 0.0,
                "address": {"country": "Atlantis"}
            },
            {
                "lat": "2.0", "lon": "2.0", "display_name": "strong",
                "importance": 0.9,
                "address": {
                    "city": "Paris", "state": "IDF", "country": "France",
                    "postcode": "75000", "country_code": "fr"
                }
            }
        ]),
    );
    let service = service(mock);

    let results = service
        .resolve("Paris", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].latitude, 2.0);
    assert!((results[0].confidence - 0.68).abs() < 1e-9);
}

#[tokio::test]
async fn results_are_ranked_by_descending_confidence() {
    let mock = MockFetch::new();
    mock.respond_json(
        "nominatim",
        200,
        &nominatim_body(&[(1.0, 1.0, 0.2), (2.0, 2.0, 0.9), (3.0, 3.0, 0.5)]),
    );
    let service = service(mock);

    let results = service
        .resolve("Springfield", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    let latitudes: Vec<f64> = results.iter().map(|r| r.latitude).collect();
    assert_eq!(latitudes, vec![2.0, 3.0, 1.0]);
    assert!(results
        .windows(2)
        .all(|pair| pair[0].confidence >= pair[1].confidence));
}

#[tokio::test]
async fn limit_truncates_the_result_list() {
    let mock = MockFetch::new();
    mock.respond_json(
        "nominatim",
        200,
        &nominatim_body(&[(1.0, 1.0, 0.9), (2.0, 2.0, 0.8), (3.0, 3.0, 0.7)]),
    );
    let service = service(mock);

    let results = service
        .resolve(
            "Springfield",
            &GeocodeOptions {
                limit: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].latitude, 1.0);
}

#[tokio::test(start_paused = true)]
async fn throttled_provider_recovers_after_backoff() {
    let mock = MockFetch::new();
    mock.respond("nominatim", 429, "");
    mock.respond("nominatim", 429, "");
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());

    let start = Instant::now();
    let results = service
        .resolve("Paris", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results[0].source, GeocodeSource::Nominatim);
    assert_eq!(mock.calls(), 3);
    // Two backoff waits: 1000ms * 2^0 + 1000ms * 2^1.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(2999), "waited {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(3600), "waited {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn total_failure_degrades_to_deterministic_synthetic() {
    let mock = MockFetch::new();
    mock.respond("nominatim", 500, "upstream exploded");
    let service = service(mock.clone());

    let first = service
        .resolve("Nowhere", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(first.len(), 1);
    let result = &first[0];
    assert_eq!(result.source, GeocodeSource::Synthetic);
    assert_eq!(result.confidence, 0.1);
    assert_eq!(result.latitude, 58.0);
    assert_eq!(result.longitude, -92.0);

    // Synthetic results are never cached: the next call retries the
    // providers and derives the same coordinates again.
    let second = service
        .resolve("Nowhere", &GeocodeOptions::default())
        .await
        .unwrap();
    assert_eq!(second[0].latitude, first[0].latitude);
    assert_eq!(second[0].longitude, first[0].longitude);
    assert_eq!(mock.calls(), 6, "three retries per resolution, no caching");
}

#[tokio::test(start_paused = true)]
async fn persistent_throttling_degrades_to_synthetic() {
    let mock = MockFetch::new();
    mock.respond("nominatim", 429, "");
    let service = service(mock.clone());

    let results = service
        .resolve("Paris", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].source.is_synthetic());
    assert_eq!(mock.calls(), 3);
}

#[tokio::test]
async fn empty_provider_response_degrades_to_synthetic() {
    let mock = MockFetch::new();
    mock.respond("nominatim", 200, "[]");
    let service = service(mock);

    let results = service
        .resolve("Unfindable Hamlet", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].source.is_synthetic());
}

#[tokio::test(start_paused = true)]
async fn deadline_elapsing_degrades_to_synthetic() {
    let mock = MockFetch::new();
    mock.hang("nominatim");
    let service = service(mock);

    let start = Instant::now();
    let results = service
        .resolve("Paris", &GeocodeOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert!(results[0].source.is_synthetic());
    // The default 5s orchestrator deadline fired.
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(4999), "waited {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(5500), "waited {elapsed:?}");
}

#[tokio::test]
async fn preferred_google_without_key_falls_back_to_nominatim() {
    let mock = MockFetch::new();
    mock.respond_json("nominatim", 200, &nominatim_body(&[(48.85, 2.35, 0.9)]));
    let service = service(mock.clone());

    let results = service
        .resolve(
            "Paris",
            &GeocodeOptions {
                preferred_provider: Some(ProviderKind::Google),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results[0].source, GeocodeSource::Nominatim);
    assert_eq!(mock.calls_matching("googleapis"), 0);
    assert_eq!(mock.calls_matching("nominatim"), 1);
}

#[tokio::test]
async fn preferred_google_with_request_key_is_used() {
    let mock = MockFetch::new();
    mock.respond_json(
        "googleapis",
        200,
        &json!({
            "status": "OK",
            "results": [{
                "formatted_address": "Paris, France",
                "place_id": "ChIJD7fiBh9u5kcRYJSMaMOCCwQ",
                "geometry": {
                    "location": {"lat": 48.8566, "lng": 2.3522},
                    "location_type": "ROOFTOP"
                },
                "address_components": [{}, {}, {}, {}]
            }]
        }),
    );
    let service = service(mock.clone());

    let results = service
        .resolve(
            "Paris",
            &GeocodeOptions {
                preferred_provider: Some(ProviderKind::Google),
                api_key: Some("req-key".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results[0].source, GeocodeSource::Google);
    assert_eq!(mock.calls_matching("googleapis"), 1);
    assert!(mock.urls().iter().any(|url| url.contains("key=req-key")));
}

#[tokio::test]
async fn preferred_mapbox_uses_the_default_public_token() {
    let mock = MockFetch::new();
    mock.respond_json(
        "mapbox",
        200,
        &json!({
            "features": [{
                "id": "place.123",
                "center": [2.3522, 48.8566],
                "place_name": "Paris, France",
                "place_type": ["place"],
                "relevance": 1.0,
                "context": [{"id": "country.1"}]
            }]
        }),
    );
    let service = service(mock.clone());

    let results = service
        .resolve(
            "Paris",
            &GeocodeOptions {
                preferred_provider: Some(ProviderKind::Mapbox),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(results[0].source, GeocodeSource::Mapbox);
    assert!((results[0].latitude - 48.8566).abs() < 1e-9);
    assert!(mock
        .urls()
        .iter()
        .any(|url| url.contains("access_token=pk.")));
}

#[tokio::test(start_paused = true)]
async fn nonempty_queries_always_yield_at_least_one_result() {
    // No routes configured at all: every provider call errors.
    let mock = MockFetch::new();
    let service = service(mock);

    for query in ["Paris", "a", "somewhere over the rainbow"] {
        let results = service
            .resolve(query, &GeocodeOptions::default())
            .await
            .unwrap();
        assert!(!results.is_empty(), "query {query:?} returned nothing");
    }
}
