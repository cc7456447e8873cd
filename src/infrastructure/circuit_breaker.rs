use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

// ── States ───────────────────────────────────────────────────────────────────
//
// Closed:   calls pass through, consecutive failures are counted and the
//           counts are cleared every `interval`.
// Open:     calls are rejected without running until `timeout` elapses.
// HalfOpen: up to `max_requests` trial calls run at once. One success closes
//           the breaker, one failure opens it again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => f.write_str("closed"),
            CircuitState::Open => f.write_str("open"),
            CircuitState::HalfOpen => f.write_str("half-open"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSettings {
    /// Consecutive failures in the closed state that open the breaker.
    pub failure_threshold: u32,
    /// Period after which closed-state counts are cleared. Zero keeps them.
    pub interval: Duration,
    /// How long the breaker stays open before letting trial calls through.
    pub timeout: Duration,
    /// Trial calls allowed in flight while half-open.
    pub max_requests: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            max_requests: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counts {
    pub requests: u32,
    pub total_successes: u32,
    pub total_failures: u32,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Counts {
    fn on_success(&mut self) {
        self.total_successes += 1;
        self.consecutive_successes += 1;
        self.consecutive_failures = 0;
    }

    fn on_failure(&mut self) {
        self.total_failures += 1;
        self.consecutive_failures += 1;
        self.consecutive_successes = 0;
    }
}

#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    #[error("circuit breaker is open")]
    Open,
    #[error("too many requests")]
    TooManyRequests,
    #[error("{0}")]
    OperationFailed(E),
}

struct BreakerState {
    state: CircuitState,
    // Bumped on every state change and every closed-state interval, so the
    // outcome of a call that started in an earlier period is dropped.
    generation: u64,
    counts: Counts,
    expiry: Option<Instant>,
}

/// Process-wide guard around one remote dependency.
///
/// Build it once at startup and share it; every caller sees the same state.
pub struct CircuitBreaker {
    name: String,
    settings: CircuitBreakerSettings,
    // Never held across an await.
    state: Mutex<BreakerState>,
}

/// A request slot taken by `before_request`.
///
/// Dropped without an outcome (the caller's future was cancelled mid-call),
/// it hands the slot back so half-open trials cannot leak.
struct Claim<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    settled: bool,
}

impl Claim<'_> {
    fn settle(mut self, success: bool) {
        self.settled = true;
        self.breaker.after_request(self.generation, success);
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(self.generation);
        }
    }
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, settings: CircuitBreakerSettings) -> Self {
        let expiry = closed_expiry(&settings, Instant::now());
        Self {
            name: name.into(),
            settings,
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                generation: 0,
                counts: Counts::default(),
                expiry,
            }),
        }
    }

    /// Runs `operation` if the breaker lets it through and records its outcome.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let claim = self.before_request::<E>()?;

        let result = operation().await;
        claim.settle(result.is_ok());

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    pub fn state(&self) -> CircuitState {
        let mut state = self.lock();
        self.current_state(&mut state, Instant::now());
        state.state
    }

    pub fn counts(&self) -> Counts {
        let mut state = self.lock();
        self.current_state(&mut state, Instant::now());
        state.counts
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // The state is consistent after every critical section, so a
        // poisoned lock is still usable.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn before_request<E>(&self) -> Result<Claim<'_>, CircuitBreakerError<E>> {
        let mut state = self.lock();
        self.current_state(&mut state, Instant::now());

        match state.state {
            CircuitState::Open => return Err(CircuitBreakerError::Open),
            CircuitState::HalfOpen if state.counts.requests >= self.settings.max_requests => {
                return Err(CircuitBreakerError::TooManyRequests)
            }
            _ => {}
        }

        state.counts.requests += 1;
        Ok(Claim {
            breaker: self,
            generation: state.generation,
            settled: false,
        })
    }

    fn after_request(&self, before: u64, success: bool) {
        let mut state = self.lock();
        let now = Instant::now();
        self.current_state(&mut state, now);
        if state.generation != before {
            return;
        }

        match (state.state, success) {
            (CircuitState::Closed, true) => state.counts.on_success(),
            (CircuitState::Closed, false) => {
                state.counts.on_failure();
                if state.counts.consecutive_failures >= self.settings.failure_threshold {
                    self.set_state(&mut state, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                state.counts.on_success();
                self.set_state(&mut state, CircuitState::Closed, now);
            }
            (CircuitState::HalfOpen, false) => self.set_state(&mut state, CircuitState::Open, now),
            (CircuitState::Open, _) => {}
        }
    }

    fn release(&self, before: u64) {
        let mut state = self.lock();
        if state.generation == before {
            state.counts.requests = state.counts.requests.saturating_sub(1);
            log::debug!(
                "circuit breaker '{}': call abandoned before completion",
                self.name
            );
        }
    }

    fn current_state(&self, state: &mut BreakerState, now: Instant) {
        match state.state {
            CircuitState::Closed => {
                if state.expiry.is_some_and(|expiry| expiry <= now) {
                    self.new_generation(state, now);
                }
            }
            CircuitState::Open => {
                if state.expiry.is_some_and(|expiry| expiry <= now) {
                    self.set_state(state, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
    }

    fn set_state(&self, state: &mut BreakerState, to: CircuitState, now: Instant) {
        if state.state == to {
            return;
        }
        let from = state.state;
        state.state = to;
        self.new_generation(state, now);

        match to {
            CircuitState::Open => log::warn!(
                "circuit breaker '{}' {} -> {}, rejecting calls for {:?}",
                self.name,
                from,
                to,
                self.settings.timeout
            ),
            _ => log::info!("circuit breaker '{}' {} -> {}", self.name, from, to),
        }
    }

    fn new_generation(&self, state: &mut BreakerState, now: Instant) {
        state.generation += 1;
        state.counts = Counts::default();
        state.expiry = match state.state {
            CircuitState::Closed => closed_expiry(&self.settings, now),
            CircuitState::Open => Some(now + self.settings.timeout),
            CircuitState::HalfOpen => None,
        };
    }
}

fn closed_expiry(settings: &CircuitBreakerSettings, now: Instant) -> Option<Instant> {
    if settings.interval.is_zero() {
        None
    } else {
        Some(now + settings.interval)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn settings(failure_threshold: u32, timeout_ms: u64) -> CircuitBreakerSettings {
        CircuitBreakerSettings {
            failure_threshold,
            interval: Duration::from_secs(60),
            timeout: Duration::from_millis(timeout_ms),
            max_requests: 1,
        }
    }

    async fn fail(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.call(|| async { Err::<(), _>("boom") }).await
    }

    async fn succeed(cb: &CircuitBreaker) -> Result<(), CircuitBreakerError<&'static str>> {
        cb.call(|| async { Ok::<_, &str>(()) }).await
    }

    #[tokio::test]
    async fn opens_after_consecutive_failures() {
        let cb = CircuitBreaker::new("test", settings(3, 1_000));

        for _ in 0..2 {
            assert!(matches!(
                fail(&cb).await,
                Err(CircuitBreakerError::OperationFailed("boom"))
            ));
        }
        assert_eq!(cb.state(), CircuitState::Closed);

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn open_breaker_does_not_run_operation() {
        let cb = CircuitBreaker::new("test", settings(1, 1_000));
        let _ = fail(&cb).await;

        let calls = AtomicU32::new(0);
        let result = cb
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, &str>(())
            })
            .await;

        assert!(matches!(result, Err(CircuitBreakerError::Open)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn success_resets_consecutive_failures() {
        let cb = CircuitBreaker::new("test", settings(2, 1_000));

        let _ = fail(&cb).await;
        succeed(&cb).await.unwrap();
        let _ = fail(&cb).await;

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.counts().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn half_open_success_closes() {
        let cb = CircuitBreaker::new("test", settings(1, 50));
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_reopens() {
        let cb = CircuitBreaker::new("test", settings(1, 50));
        let _ = fail(&cb).await;

        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = fail(&cb).await;

        assert_eq!(cb.state(), CircuitState::Open);
        assert!(matches!(succeed(&cb).await, Err(CircuitBreakerError::Open)));
    }

    #[tokio::test]
    async fn half_open_limits_concurrent_trials() {
        let cb = Arc::new(CircuitBreaker::new("test", settings(1, 50)));
        let _ = fail(&cb).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let trial = {
            let cb = Arc::clone(&cb);
            tokio::spawn(async move {
                cb.call(|| async move {
                    let _ = release_rx.await;
                    Ok::<_, &str>(())
                })
                .await
                .is_ok()
            })
        };

        // Let the trial claim the single half-open slot.
        while cb.counts().requests == 0 {
            tokio::task::yield_now().await;
        }
        assert!(matches!(
            succeed(&cb).await,
            Err(CircuitBreakerError::TooManyRequests)
        ));

        release_tx.send(()).unwrap();
        assert!(trial.await.unwrap());
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn error_messages() {
        assert_eq!(
            CircuitBreakerError::<&str>::Open.to_string(),
            "circuit breaker is open"
        );
        assert_eq!(
            CircuitBreakerError::<&str>::TooManyRequests.to_string(),
            "too many requests"
        );
        assert_eq!(
            CircuitBreakerError::OperationFailed("boom").to_string(),
            "boom"
        );
    }

    #[tokio::test]
    async fn cancelled_half_open_trial_gives_its_slot_back() {
        let cb = CircuitBreaker::new("test", settings(1, 50));
        let _ = fail(&cb).await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        let stuck = cb.call(std::future::pending::<Result<(), &'static str>>);
        assert!(tokio::time::timeout(Duration::from_millis(10), stuck)
            .await
            .is_err());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.counts().requests, 0);

        succeed(&cb).await.unwrap();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn cancelled_call_while_closed_is_not_a_failure() {
        let cb = CircuitBreaker::new("test", settings(1, 1_000));

        let stuck = cb.call(std::future::pending::<Result<(), &'static str>>);
        assert!(tokio::time::timeout(Duration::from_millis(10), stuck)
            .await
            .is_err());

        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.counts(), Counts::default());
    }

    #[tokio::test]
    async fn failures_older_than_interval_are_forgotten() {
        let cb = CircuitBreaker::new(
            "test",
            CircuitBreakerSettings {
                failure_threshold: 2,
                interval: Duration::from_millis(50),
                timeout: Duration::from_secs(1),
                max_requests: 1,
            },
        );

        let _ = fail(&cb).await;
        tokio::time::sleep(Duration::from_millis(80)).await;
        let _ = fail(&cb).await;

        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn outcome_from_previous_generation_is_ignored() {
        let cb = Arc::new(CircuitBreaker::new("test", settings(1, 1_000)));

        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let slow = {
            let cb = Arc::clone(&cb);
            tokio::spawn(async move {
                cb.call(|| async move {
                    let _ = release_rx.await;
                    Ok::<_, &str>(())
                })
                .await
            })
        };
        while cb.counts().requests == 0 {
            tokio::task::yield_now().await;
        }

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        release_tx.send(()).unwrap();
        assert!(slow.await.unwrap().is_ok());
        assert_eq!(cb.state(), CircuitState::Open);
    }
}
