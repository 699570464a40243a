//! Resilience pipeline around a single upstream call.
//!
//! Stages, outermost first:
//!
//! ```text
//! CircuitBreaker ─▶ RetryPolicy ─▶ RateLimiter ─▶ attempt timeout ─▶ raw call
//! ```
//!
//! Every stage exposes the same `execute` shape (an async operation producing
//! `Result<T, LookupError>`), so each can be exercised on its own. Because the
//! breaker wraps the retry loop, one logical request contributes one breaker
//! sample after its retries are exhausted, while every individual attempt
//! needs its own rate-limiter permit.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::LookupError;
use crate::retry::RetryPolicy;
use crate::throttling::RateLimiter;

#[derive(Debug, Clone)]
pub struct ResiliencePipeline {
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
    limiter: RateLimiter,
    attempt_timeout: Duration,
}

impl ResiliencePipeline {
    pub fn new(
        breaker: Arc<CircuitBreaker>,
        retry: RetryPolicy,
        limiter: RateLimiter,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            breaker,
            retry,
            limiter,
            attempt_timeout,
        }
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub const fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Run `call` through every stage. `call` is invoked once per attempt.
    pub async fn execute<T, F, Fut>(&self, mut call: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let limiter = &self.limiter;
        let attempt_timeout = self.attempt_timeout;

        self.breaker
            .execute(
                self.retry
                    .execute(|| limiter.execute(with_timeout(attempt_timeout, call()))),
            )
            .await
    }
}

/// Bound one attempt; on expiry the attempt future is dropped.
pub async fn with_timeout<T, Fut>(limit: Duration, attempt: Fut) -> Result<T, LookupError>
where
    Fut: Future<Output = Result<T, LookupError>>,
{
    match tokio::time::timeout(limit, attempt).await {
        Ok(result) => result,
        Err(_) => Err(LookupError::upstream(format!(
            "upstream attempt timed out after {} ms",
            limit.as_millis()
        ))),
    }
}
