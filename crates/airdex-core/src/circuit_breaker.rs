use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::LookupError;

/// Runtime circuit state for upstream calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Circuit breaker thresholds and timers.
///
/// Rates are percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes kept in the sliding window.
    pub window_size: usize,
    /// Outcomes required in the window before rates are evaluated.
    pub minimum_calls: usize,
    pub failure_rate_threshold: f64,
    pub slow_call_rate_threshold: f64,
    pub slow_call_duration: Duration,
    /// Time spent open before probes are let through.
    pub open_wait: Duration,
    pub half_open_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            minimum_calls: 5,
            failure_rate_threshold: 50.0,
            slow_call_rate_threshold: 100.0,
            slow_call_duration: Duration::from_secs(5),
            open_wait: Duration::from_secs(30),
            half_open_probes: 3,
        }
    }
}

/// Observable breaker state for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub buffered_calls: usize,
    pub failure_rate: Option<f64>,
    pub slow_call_rate: Option<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    failed: bool,
    slow: bool,
}

#[derive(Debug)]
struct CircuitInner {
    state: CircuitState,
    window: VecDeque<Sample>,
    opened_at: Option<Instant>,
    probes_admitted: u32,
    probes_succeeded: u32,
    // Bumped on every transition so outcomes admitted under an older state are dropped.
    epoch: u64,
}

impl Default for CircuitInner {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            window: VecDeque::new(),
            opened_at: None,
            probes_admitted: 0,
            probes_succeeded: 0,
            epoch: 0,
        }
    }
}

impl CircuitInner {
    fn rates(&self) -> Option<(f64, f64)> {
        if self.window.is_empty() {
            return None;
        }
        let total = self.window.len() as f64;
        let failed = self.window.iter().filter(|s| s.failed).count() as f64;
        let slow = self.window.iter().filter(|s| s.slow).count() as f64;
        Some((failed * 100.0 / total, slow * 100.0 / total))
    }

    fn transition(&mut self, name: &str, to: CircuitState) {
        let from = self.state;
        self.state = to;
        self.epoch = self.epoch.wrapping_add(1);
        self.probes_admitted = 0;
        self.probes_succeeded = 0;
        self.window.clear();
        self.opened_at = (to == CircuitState::Open).then(Instant::now);
        tracing::warn!(breaker = name, ?from, ?to, "circuit breaker state changed");
    }
}

/// Thread-safe circuit breaker guarding one upstream.
///
/// Only outcomes settled through [`CallPermit::record_failure`] count as
/// failures; client-side errors release their permit unrecorded.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<CircuitInner>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new("default", CircuitBreakerConfig::default())
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(CircuitInner::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Admit one call, or `None` while open or when the half-open
    /// budget is spent.
    ///
    /// The returned permit must be settled with
    /// [`record_success`](CallPermit::record_success) or
    /// [`record_failure`](CallPermit::record_failure); dropping it instead
    /// releases the admission without recording an outcome.
    pub fn try_acquire(&self) -> Option<CallPermit<'_>> {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => {}
            CircuitState::Open => {
                if !self.open_wait_elapsed(&inner) {
                    return None;
                }
                inner.transition(&self.name, CircuitState::HalfOpen);
                inner.probes_admitted = 1;
            }
            CircuitState::HalfOpen => {
                if inner.probes_admitted >= self.config.half_open_probes {
                    return None;
                }
                inner.probes_admitted += 1;
            }
        }

        Some(CallPermit {
            breaker: self,
            epoch: inner.epoch,
            started: Instant::now(),
            settled: false,
        })
    }

    /// Whether a call would be admitted right now. Does not consume a half-open slot.
    pub fn allow_request(&self) -> bool {
        let inner = self.lock();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => self.open_wait_elapsed(&inner),
            CircuitState::HalfOpen => inner.probes_admitted < self.config.half_open_probes,
        }
    }

    fn open_wait_elapsed(&self, inner: &CircuitInner) -> bool {
        inner
            .opened_at
            .is_some_and(|opened_at| opened_at.elapsed() >= self.config.open_wait)
    }

    fn settle(&self, epoch: u64, outcome: Option<(bool, Duration)>) {
        let mut inner = self.lock();
        if inner.epoch != epoch {
            return;
        }
        match outcome {
            Some((false, elapsed)) => self.on_success(&mut inner, elapsed),
            Some((true, elapsed)) => self.on_failure(&mut inner, elapsed),
            None => {
                if inner.state == CircuitState::HalfOpen {
                    inner.probes_admitted = inner.probes_admitted.saturating_sub(1);
                }
            }
        }
    }

    fn on_success(&self, inner: &mut CircuitInner, elapsed: Duration) {
        match inner.state {
            CircuitState::Closed => {
                let slow = elapsed >= self.config.slow_call_duration;
                self.push_sample(inner, Sample { failed: false, slow });
            }
            CircuitState::HalfOpen => {
                inner.probes_succeeded += 1;
                if inner.probes_succeeded >= self.config.half_open_probes {
                    inner.transition(&self.name, CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn on_failure(&self, inner: &mut CircuitInner, elapsed: Duration) {
        match inner.state {
            CircuitState::Closed => {
                let slow = elapsed >= self.config.slow_call_duration;
                self.push_sample(inner, Sample { failed: true, slow });
            }
            CircuitState::HalfOpen => inner.transition(&self.name, CircuitState::Open),
            CircuitState::Open => {}
        }
    }

    fn push_sample(&self, inner: &mut CircuitInner, sample: Sample) {
        inner.window.push_back(sample);
        while inner.window.len() > self.config.window_size.max(1) {
            inner.window.pop_front();
        }

        let minimum = self.config.minimum_calls.clamp(1, self.config.window_size.max(1));
        if inner.window.len() < minimum {
            return;
        }

        if let Some((failure_rate, slow_rate)) = inner.rates() {
            if failure_rate >= self.config.failure_rate_threshold
                || slow_rate >= self.config.slow_call_rate_threshold
            {
                tracing::warn!(
                    breaker = %self.name,
                    failure_rate,
                    slow_rate,
                    "circuit breaker thresholds exceeded"
                );
                inner.transition(&self.name, CircuitState::Open);
            }
        }
    }

    /// Run `call` under the breaker.
    ///
    /// Rejects with [`LookupError::circuit_open`] without polling `call` when
    /// the circuit is open or the half-open budget is spent. Errors that
    /// do not [count toward the breaker](LookupError::counts_toward_breaker)
    /// release their admission unrecorded, as does dropping the returned future.
    pub async fn execute<T, Fut>(&self, call: Fut) -> Result<T, LookupError>
    where
        Fut: Future<Output = Result<T, LookupError>>,
    {
        let Some(permit) = self.try_acquire() else {
            tracing::debug!(breaker = %self.name, "circuit open; rejecting call");
            return Err(LookupError::circuit_open(&self.name));
        };

        let result = call.await;
        match &result {
            Ok(_) => permit.record_success(),
            Err(error) if error.counts_toward_breaker() => {
                tracing::debug!(breaker = %self.name, %error, "circuit breaker recorded failure");
                permit.record_failure();
            }
            Err(_) => drop(permit),
        }
        result
    }

    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        inner.state
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        let rates = inner.rates();
        CircuitSnapshot {
            name: self.name.clone(),
            state: inner.state,
            buffered_calls: inner.window.len(),
            failure_rate: rates.map(|(failure, _)| failure),
            slow_call_rate: rates.map(|(_, slow)| slow),
        }
    }
}

/// One admitted call. Unsettled permits release their slot on drop.
#[derive(Debug)]
#[must_use = "dropping a permit releases it without recording an outcome"]
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    epoch: u64,
    started: Instant,
    settled: bool,
}

impl CallPermit<'_> {
    pub fn record_success(self) {
        let elapsed = self.started.elapsed();
        self.record(false, elapsed);
    }

    pub fn record_failure(self) {
        let elapsed = self.started.elapsed();
        self.record(true, elapsed);
    }

    fn record(mut self, failed: bool, elapsed: Duration) {
        self.settled = true;
        self.breaker.settle(self.epoch, Some((failed, elapsed)));
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.settle(self.epoch, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LookupErrorKind;

    const FAST: Duration = Duration::from_millis(1);

    fn breaker(open_wait: Duration) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                window_size: 10,
                minimum_calls: 5,
                open_wait,
                ..CircuitBreakerConfig::default()
            },
        )
    }

    fn succeed(breaker: &CircuitBreaker, elapsed: Duration) {
        breaker
            .try_acquire()
            .expect("call admitted")
            .record(false, elapsed);
    }

    fn fail(breaker: &CircuitBreaker) {
        breaker.try_acquire().expect("call admitted").record(true, FAST);
    }

    fn opened(open_wait: Duration) -> CircuitBreaker {
        let breaker = breaker(open_wait);
        for _ in 0..5 {
            fail(&breaker);
        }
        assert_eq!(breaker.state(), CircuitState::Open);
        breaker
    }

    #[test]
    fn stays_closed_below_minimum_calls() {
        let breaker = breaker(Duration::from_secs(30));
        for _ in 0..4 {
            fail(&breaker);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.allow_request());
    }

    #[test]
    fn opens_once_failure_rate_reaches_threshold() {
        let breaker = breaker(Duration::from_secs(30));
        for _ in 0..3 {
            succeed(&breaker, FAST);
        }
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);

        // 2 of 5 failed: 40%
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Closed);

        // 3 of 6 failed: 50%
        fail(&breaker);
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.allow_request());
        assert!(breaker.try_acquire().is_none());
    }

    #[test]
    fn window_slides_over_last_n_outcomes() {
        let breaker = breaker(Duration::from_secs(30));
        fail(&breaker);
        fail(&breaker);
        for _ in 0..8 {
            succeed(&breaker, FAST);
        }
        assert_eq!(breaker.snapshot().failure_rate, Some(20.0));

        // Both failures fall out of the window.
        succeed(&breaker, FAST);
        succeed(&breaker, FAST);
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().buffered_calls, 10);
        assert_eq!(breaker.snapshot().failure_rate, Some(0.0));
    }

    #[test]
    fn opens_when_every_call_is_slow() {
        let breaker = breaker(Duration::from_secs(30));
        let slow = breaker.config().slow_call_duration;
        for _ in 0..4 {
            succeed(&breaker, slow);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        succeed(&breaker, slow + FAST);
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_closes_after_all_probes_succeed() {
        let breaker = opened(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));

        let trials: Vec<_> = (0..3)
            .map(|_| breaker.try_acquire().expect("trial admitted"))
            .collect();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        assert!(breaker.try_acquire().is_none(), "half-open budget is three calls");

        let mut trials = trials.into_iter();
        for trial in trials.by_ref().take(2) {
            trial.record(false, FAST);
        }
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        for trial in trials {
            trial.record(false, FAST);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert_eq!(breaker.snapshot().buffered_calls, 0);
    }

    #[test]
    fn half_open_reopens_on_any_probe_failure() {
        let breaker = opened(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));

        succeed(&breaker, FAST);
        fail(&breaker);

        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn checking_admission_does_not_consume_half_open_slots() {
        let breaker = opened(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));

        for _ in 0..10 {
            assert!(breaker.allow_request());
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        for _ in 0..3 {
            succeed(&breaker, FAST);
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn dropped_permit_frees_half_open_slot() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                half_open_probes: 1,
                minimum_calls: 1,
                open_wait: Duration::from_millis(1),
                ..CircuitBreakerConfig::default()
            },
        );
        fail(&breaker);
        std::thread::sleep(Duration::from_millis(5));

        let trial = breaker.try_acquire().expect("trial admitted");
        assert!(breaker.try_acquire().is_none());
        drop(trial);
        assert!(breaker.allow_request());
        succeed(&breaker, FAST);
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn execute_classifies_outcomes() {
        let breaker = CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                minimum_calls: 2,
                window_size: 2,
                ..CircuitBreakerConfig::default()
            },
        );

        for terminal in [
            LookupError::not_found("KJFK"),
            LookupError::mapping("bad payload"),
            LookupError::invalid_key("bad key"),
            LookupError::upstream_terminal("403 forbidden"),
        ] {
            let result: Result<(), _> = breaker.execute(async { Err(terminal) }).await;
            assert!(result.is_err());
        }
        assert_eq!(breaker.snapshot().buffered_calls, 0);
        assert_eq!(breaker.state(), CircuitState::Closed);

        for _ in 0..2 {
            let _: Result<(), _> = breaker
                .execute(async { Err(LookupError::upstream("503")) })
                .await;
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let rejected: Result<u8, _> = breaker.execute(async { Ok(1) }).await;
        let error = rejected.expect_err("open circuit rejects");
        assert_eq!(error.kind(), LookupErrorKind::CircuitOpen);
    }

    #[tokio::test]
    async fn cancelled_half_open_calls_do_not_wedge_the_breaker() {
        // Given: A breaker whose open wait has passed
        let breaker = opened(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;

        // When: Every half-open call is abandoned before it finishes
        for _ in 0..3 {
            let abandoned = tokio::time::timeout(
                Duration::from_millis(5),
                breaker.execute(std::future::pending::<Result<(), LookupError>>()),
            )
            .await;
            assert!(abandoned.is_err(), "call should time out");
        }

        // Then: Later calls are still admitted and can close the circuit
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        for _ in 0..3 {
            let result: Result<u8, _> = breaker.execute(async { Ok(1) }).await;
            assert_eq!(result, Ok(1));
        }
        assert_eq!(breaker.state(), CircuitState::Closed);
    }
}
