//! Retry Scheduler
//!
//! Bounded retry loop with exponential backoff and uniform jitter. Each failed
//! attempt goes through [`ErrorClassifier`]; only Timeout, RateLimited and
//! ServerError are retried.
//!
//! Delay before retry `i` (0-indexed):
//! `min(initial_delay * 2^i, max_delay) + uniform(0, jitter_max)`.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::types::{AttemptContext, ErrorClassifier, Failure, QueryResult};

#[derive(Debug, Clone)]
pub struct RetryScheduler {
    config: RetryConfig,
}

impl RetryScheduler {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Exponential part of the delay before retry `attempt_index`
    pub fn backoff_base(&self, attempt_index: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt_index).unwrap_or(u64::MAX);
        let ms = self
            .config
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.config.max_delay_ms);
        Duration::from_millis(ms)
    }

    /// Full delay before retry `attempt_index`, jitter included
    pub fn backoff_delay(&self, attempt_index: u32) -> Duration {
        self.backoff_base(attempt_index) + random_jitter(self.config.jitter_max_ms)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable kind, or
    /// the attempt budget is spent.
    ///
    /// `operation` receives the 1-based attempt number. The returned error
    /// carries the number of attempts actually made.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> QueryResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, Failure>>,
    {
        let max_attempts = self.config.max_attempts();
        let mut attempt_index: u32 = 0;

        loop {
            let attempt = attempt_index + 1;

            let failure = match operation(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(failure) => failure,
            };

            let classified = ErrorClassifier::classify(failure, AttemptContext::new(attempt));

            if !classified.is_retryable() {
                warn!(
                    attempt,
                    kind = %classified.kind,
                    error = %classified.message,
                    "Non-retryable failure"
                );
                return Err(classified);
            }

            if attempt >= max_attempts {
                warn!(
                    attempts = attempt,
                    kind = %classified.kind,
                    error = %classified.message,
                    "Retries exhausted"
                );
                return Err(classified);
            }

            let delay = self.backoff_delay(attempt_index);
            warn!(
                attempt,
                max_attempts,
                kind = %classified.kind,
                delay_ms = delay.as_millis() as u64,
                "Attempt failed, backing off"
            );
            sleep(delay).await;
            attempt_index += 1;
        }
    }
}

/// Uniform jitter in `[0, max_ms]` using the thread-local RNG
fn random_jitter(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=max_ms))
}
