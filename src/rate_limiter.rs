//! Token-bucket rate limiter gating outbound provider requests
//!
//! Each provider adapter owns one limiter sized to that provider's
//! published request budget. Tokens refill lazily on acquisition attempts;
//! there is no background task.

use crate::error::{GeocodeError, Result};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: u32,
    last_refill: Instant,
}

/// Token-bucket admission control
///
/// Capacity equals the configured request budget; one token refills every
/// `time_window / max_requests`. `acquire` suspends until a token is
/// available and consumes it. Concurrent waiters are served roughly in
/// arrival order, but each recomputes its own wait, so strict FIFO is not
/// guaranteed.
pub struct RateLimiter {
    state: Mutex<BucketState>,
    max_tokens: u32,
    refill_interval: Duration,
}

impl RateLimiter {
    /// Create a limiter allowing `max_requests` per `time_window`.
    ///
    /// # Errors
    /// Rejects a zero request budget or zero window: both would make the
    /// refill interval undefined.
    pub fn new(max_requests: u32, time_window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(GeocodeError::InvalidRequest(
                "rate limiter requires max_requests >= 1".into(),
            ));
        }
        let refill_interval = time_window / max_requests;
        if refill_interval.is_zero() {
            return Err(GeocodeError::InvalidRequest(
                "rate limiter time window is too small for the request budget".into(),
            ));
        }

        Ok(Self {
            state: Mutex::new(BucketState {
                tokens: max_requests,
                last_refill: Instant::now(),
            }),
            max_tokens: max_requests,
            refill_interval,
        })
    }

    /// Suspend until a token is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill);

                if elapsed >= self.refill_interval {
                    let refills =
                        (elapsed.as_nanos() / self.refill_interval.as_nanos()) as u64;
                    let deficit = u64::from(self.max_tokens - state.tokens);
                    if refills >= deficit {
                        // Bucket is full; elapsed time beyond capacity is forfeited.
                        state.tokens = self.max_tokens;
                        state.last_refill = now;
                    } else {
                        state.tokens += refills as u32;
                        state.last_refill += self.refill_interval * refills as u32;
                    }
                }

                if state.tokens > 0 {
                    state.tokens -= 1;
                    return;
                }

                // Next token is due one refill interval after the last refill.
                self.refill_interval
                    .saturating_sub(now.duration_since(state.last_refill))
            };

            tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }
}
