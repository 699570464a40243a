//! Bounded retries of upstream faults with doubling backoff.

use std::future::Future;
use std::time::Duration;

use crate::error::LookupError;

/// Wait schedule between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Same wait before every retry.
    Constant(Duration),
    /// `initial * 2^retry`, clamped to `ceiling`.
    Doubling {
        initial: Duration,
        ceiling: Duration,
        /// Spread each wait uniformly over `[wait / 2, wait * 3 / 2]`.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::doubling(Duration::from_millis(500))
    }
}

impl Backoff {
    /// Doubling from `initial` with a one-minute ceiling and no jitter.
    pub const fn doubling(initial: Duration) -> Self {
        Self::Doubling {
            initial,
            ceiling: Duration::from_secs(60),
            jitter: false,
        }
    }

    /// Wait before retry number `retry`, counted from zero.
    pub fn delay(self, retry: u32) -> Duration {
        match self {
            Self::Constant(wait) => wait,
            Self::Doubling {
                initial,
                ceiling,
                jitter,
            } => {
                let wait = initial
                    .checked_mul(1_u32.checked_shl(retry).unwrap_or(u32::MAX))
                    .map_or(ceiling, |wait| wait.min(ceiling));
                if jitter {
                    spread(wait)
                } else {
                    wait
                }
            }
        }
    }
}

fn spread(wait: Duration) -> Duration {
    let millis = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
    let half = millis / 2;
    Duration::from_millis(half + fastrand::u64(0..=millis))
}

/// Bounded retry of retryable upstream faults.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// The backoff strategy to use between attempts.
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::default(),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff doubling from `base_delay`.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::doubling(base_delay),
        }
    }

    /// Constant wait between attempts.
    pub fn constant(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Constant(delay),
        }
    }

    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Wait before attempt `attempt` (1-based); zero for the first attempt.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            Duration::ZERO
        } else {
            self.backoff.delay(attempt - 2)
        }
    }

    /// Run `operation` until it succeeds, fails terminally, or attempts run out.
    ///
    /// Exhaustion returns the last observed error.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, LookupError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.retryable() && attempt < max_attempts => {
                    attempt += 1;
                    let delay = self.delay_before_attempt(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "retrying upstream call"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    if error.retryable() {
                        tracing::error!(attempts = attempt, %error, "retries exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}
