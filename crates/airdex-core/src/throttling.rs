use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter as GovernorLimiter};

use crate::error::LookupError;

/// Token-bucket settings: `permits` per `period`, waiting at most `max_wait` for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    pub permits: u32,
    pub period: Duration,
    pub max_wait: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            permits: 100,
            period: Duration::from_secs(60),
            max_wait: Duration::from_secs(5),
        }
    }
}

type DirectRateLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Shared permit bucket applied to every individual upstream attempt.
///
/// The bucket starts full; permits replenish evenly across `period`.
#[derive(Clone)]
pub struct RateLimiter {
    name: String,
    limiter: Arc<DirectRateLimiter>,
    config: RateLimiterConfig,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let quota = quota_from_window(config.period, config.permits);
        Self {
            name: name.into(),
            limiter: Arc::new(GovernorLimiter::direct(quota)),
            config,
        }
    }

    pub const fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Take a permit without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    /// Wait up to `max_wait` for a permit.
    pub async fn acquire(&self) -> Result<(), LookupError> {
        if self.try_acquire() {
            tracing::debug!(limiter = %self.name, "rate limiter granted permit");
            return Ok(());
        }

        match tokio::time::timeout(self.config.max_wait, self.limiter.until_ready()).await {
            Ok(()) => {
                tracing::debug!(limiter = %self.name, "rate limiter granted permit after waiting");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(
                    limiter = %self.name,
                    max_wait_ms = self.config.max_wait.as_millis() as u64,
                    "rate limiter rejected call"
                );
                Err(LookupError::rate_limited(format!(
                    "no permit from rate limiter '{}' within {:?}",
                    self.name, self.config.max_wait
                )))
            }
        }
    }

    /// Acquire a permit, then run `call`.
    pub async fn execute<T, Fut>(&self, call: Fut) -> Result<T, LookupError>
    where
        Fut: Future<Output = Result<T, LookupError>>,
    {
        self.acquire().await?;
        call.await
    }
}

fn quota_from_window(period: Duration, permits: u32) -> Quota {
    let burst = NonZeroU32::new(permits.max(1)).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (period.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let replenish = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(replenish)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn grants_burst_then_refuses() {
        let limiter = RateLimiter::new(
            "test",
            RateLimiterConfig {
                permits: 2,
                period: Duration::from_secs(60),
                max_wait: Duration::ZERO,
            },
        );

        assert!(limiter.try_acquire());
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn rejects_after_bounded_wait() {
        let limiter = RateLimiter::new(
            "test",
            RateLimiterConfig {
                permits: 1,
                period: Duration::from_secs(60),
                max_wait: Duration::from_millis(50),
            },
        );

        assert!(limiter.acquire().await.is_ok());

        let started = Instant::now();
        let error = limiter.acquire().await.expect_err("bucket is empty");
        assert_eq!(error.kind(), crate::LookupErrorKind::RateLimited);
        assert!(!error.retryable());
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn waits_for_replenished_permit() {
        let limiter = RateLimiter::new(
            "test",
            RateLimiterConfig {
                permits: 10,
                period: Duration::from_millis(200),
                max_wait: Duration::from_secs(1),
            },
        );

        for _ in 0..10 {
            assert!(limiter.try_acquire());
        }
        // One permit returns every 20ms.
        assert!(limiter.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn execute_skips_call_without_permit() {
        let limiter = RateLimiter::new(
            "test",
            RateLimiterConfig {
                permits: 1,
                period: Duration::from_secs(60),
                max_wait: Duration::ZERO,
            },
        );
        assert!(limiter.try_acquire());

        let mut polled = false;
        let result = limiter
            .execute(async {
                polled = true;
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert!(!polled);
    }
}
