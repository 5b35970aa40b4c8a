//! Retry of booking writes that lost a serialization race.
//!
//! Only [`SlotwiseError::Serialization`] is retried. Every other error,
//! including `Conflict` raised by the in-transaction overlap check, is
//! returned at once. After the last retry a serialization failure
//! surfaces as `Conflict`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use slotwise_core::error::{SlotwiseError, SlotwiseResult};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Exponential backoff with jitter. Retry `n` sleeps a random duration in
/// `[min_ms, min_ms * 2^n]`, with the upper bound capped at `max_ms`.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Backoff {
    /// Upper bound of the window for the given retry.
    pub fn ceiling_ms(&self, attempt: u32) -> u64 {
        let cap = self.max_ms.max(self.min_ms);
        1u64.checked_shl(attempt)
            .and_then(|factor| self.min_ms.checked_mul(factor))
            .map_or(cap, |grown| grown.min(cap))
    }

    fn pick(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling_ms(attempt);
        Duration::from_millis(rand::rng().random_range(self.min_ms..=ceiling))
    }
}

/// Run `f` until it succeeds, fails with a non-retryable error, or has
/// been retried `max_retries` times.
pub async fn retry_serialization<F, Fut, T>(
    mut f: F,
    max_retries: u32,
    backoff: Backoff,
) -> SlotwiseResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SlotwiseResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        match f().await {
            Err(SlotwiseError::Serialization(reason)) => {
                if attempt >= max_retries {
                    warn!(
                        attempts = attempt + 1,
                        reason = %reason,
                        "Serialization retries exhausted"
                    );
                    return Err(SlotwiseError::Conflict { booking_id: None });
                }
                attempt += 1;
                let delay = backoff.pick(attempt);
                debug!(
                    attempt,
                    max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Serialization failure, retrying after backoff"
                );
                sleep(delay).await;
            }
            other => return other,
        }
    }
}
