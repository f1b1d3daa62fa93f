//! HTTP fetch port and the shared rate-limited retry helper
//!
//! Provider adapters never talk to the network directly: they go through
//! the [`HttpFetch`] trait so tests can substitute a scripted fetcher and
//! assert on call counts. The default adapter is a thin `reqwest` wrapper.

use crate::error::{GeocodeError, Result};
use crate::rate_limiter::RateLimiter;
use async_trait::async_trait;
use std::time::Duration;

/// Retry attempts per provider request
pub const MAX_RETRIES: u32 = 3;
/// Base delay for exponential backoff between attempts
pub const BASE_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Minimal response surface the adapters need: status plus body text
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP capability (GET with JSON response bodies)
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production fetcher backed by `reqwest`
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Build a client with the crate User-Agent and a transport timeout.
    ///
    /// Nominatim requires an identifying User-Agent on every request, so
    /// it is set client-wide.
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| GeocodeError::service_with("failed to build HTTP client", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpFetch for ReqwestFetch {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GeocodeError::service_with("request failed", e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| GeocodeError::service_with("failed to read response body", e))?;

        Ok(HttpResponse { status, body })
    }
}

/// Fetch `url` with rate limiting, retry, and exponential backoff.
///
/// Every attempt first passes the provider's rate limiter. HTTP 429 backs
/// off `base_delay * 2^attempt` and retries; any other non-2xx status or
/// transport error takes the same backoff path. After the final attempt
/// the last error is propagated; persistent throttling surfaces as
/// [`GeocodeError::RateLimit`].
pub async fn fetch_with_retry(
    fetch: &dyn HttpFetch,
    limiter: &RateLimiter,
    url: &str,
    max_retries: u32,
    base_delay: Duration,
) -> Result<HttpResponse> {
    let attempts = max_retries.max(1);
    let mut last_error = GeocodeError::service("no fetch attempts were made");

    for attempt in 0..attempts {
        limiter.acquire().await;

        match fetch.get(url).await {
            Ok(response) if response.is_success() => return Ok(response),
            Ok(response) if response.status == 429 => {
                tracing::debug!(attempt, "upstream throttled (HTTP 429)");
                last_error =
                    GeocodeError::RateLimit("upstream returned HTTP 429".into());
            }
            Ok(response) => {
                tracing::debug!(attempt, status = response.status, "unexpected HTTP status");
                last_error = GeocodeError::service(format!(
                    "unexpected HTTP status {}",
                    response.status
                ));
            }
            Err(e) => {
                tracing::debug!(attempt, error = %e, "fetch attempt failed");
                last_error = e;
            }
        }

        if attempt + 1 < attempts {
            let delay = base_delay * 2u32.pow(attempt);
            tokio::time::sleep(delay).await;
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    struct ScriptedFetch {
        responses: Mutex<VecDeque<HttpResponse>>,
        calls: Mutex<u32>,
    }

    impl ScriptedFetch {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl HttpFetch for ScriptedFetch {
        async fn get(&self, _url: &str) -> Result<HttpResponse> {
            *self.calls.lock().unwrap() += 1;
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.pop_front().unwrap())
            } else {
                responses
                    .front()
                    .cloned()
                    .ok_or_else(|| GeocodeError::service("script exhausted"))
            }
        }
    }

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            body: String::new(),
        }
    }

    fn wide_open_limiter() -> RateLimiter {
        RateLimiter::new(1000, Duration::from_secs(1)).unwrap()
    }

    #[tokio::test]
    async fn success_returns_immediately() {
        let fetch = ScriptedFetch::new(vec![response(200)]);
        let limiter = wide_open_limiter();

        let result =
            fetch_with_retry(&fetch, &limiter, "http://x", MAX_RETRIES, BASE_RETRY_DELAY)
                .await;
        assert!(result.is_ok());
        assert_eq!(fetch.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throttling_backs_off_exponentially_then_succeeds() {
        let fetch = ScriptedFetch::new(vec![response(429), response(429), response(200)]);
        let limiter = wide_open_limiter();

        let start = Instant::now();
        let result =
            fetch_with_retry(&fetch, &limiter, "http://x", MAX_RETRIES, BASE_RETRY_DELAY)
                .await;

        assert!(result.is_ok());
        assert_eq!(fetch.calls(), 3);
        // 1000ms * 2^0 + 1000ms * 2^1
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2999), "waited {elapsed:?}");
        assert!(elapsed <= Duration::from_millis(3500), "waited {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_throttling_surfaces_rate_limit() {
        let fetch = ScriptedFetch::new(vec![response(429)]);
        let limiter = wide_open_limiter();

        let result =
            fetch_with_retry(&fetch, &limiter, "http://x", MAX_RETRIES, BASE_RETRY_DELAY)
                .await;
        assert!(matches!(result, Err(GeocodeError::RateLimit(_))));
        assert_eq!(fetch.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn server_errors_retry_then_propagate() {
        let fetch = ScriptedFetch::new(vec![response(500)]);
        let limiter = wide_open_limiter();

        let result =
            fetch_with_retry(&fetch, &limiter, "http://x", MAX_RETRIES, BASE_RETRY_DELAY)
                .await;
        match result {
            Err(GeocodeError::Service { message, .. }) => {
                assert!(message.contains("500"), "unexpected message: {message}")
            }
            other => panic!("expected service error, got {other:?}"),
        }
        assert_eq!(fetch.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn no_backoff_sleep_after_final_attempt() {
        let fetch = ScriptedFetch::new(vec![response(500)]);
        let limiter = wide_open_limiter();

        let start = Instant::now();
        let _ =
            fetch_with_retry(&fetch, &limiter, "http://x", MAX_RETRIES, BASE_RETRY_DELAY)
                .await;
        // Backoff after attempts 0 and 1 only: 1s + 2s.
        let elapsed = start.elapsed();
        assert!(elapsed <= Duration::from_millis(3100), "waited {elapsed:?}");
    }
}
