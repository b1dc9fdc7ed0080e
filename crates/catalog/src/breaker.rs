//! Consecutive-failure circuit breaker.
//!
//! One breaker guards one upstream dependency. It is shared by every request
//! that calls that dependency, so all state sits behind a mutex. Time comes
//! from `tokio::time`, which lets tests pause and advance the clock.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Consecutive failures that open the breaker by default.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// How long an open breaker rejects calls by default.
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Breaker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker.
    pub failure_threshold: u32,

    /// Time an open breaker waits before admitting a trial call.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStatus {
    /// Calls pass through.
    Closed,

    /// Calls are rejected until the cooldown elapses.
    Open,

    /// Open, but the cooldown has elapsed; the next call is a trial.
    Probing,
}

impl BreakerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::Probing => "probing",
        }
    }
}

impl std::fmt::Display for BreakerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default)]
struct BreakerState {
    consecutive_failures: u32,
    open: bool,
    tripped_at: Option<Instant>,
}

/// Circuit breaker guarding one upstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config: CircuitBreakerConfig {
                failure_threshold: config.failure_threshold.max(1),
                cooldown: config.cooldown,
            },
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        // Every update leaves the state valid, so poisoning is ignored
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decides whether a call may go to the upstream.
    ///
    /// A closed breaker always admits. An open breaker rejects until the
    /// cooldown has elapsed, then admits exactly one trial and re-arms the
    /// trip timer so concurrent callers keep being rejected while the trial
    /// is in flight.
    pub fn allow_request(&self) -> bool {
        let mut state = self.lock();
        if !state.open {
            return true;
        }

        let now = Instant::now();
        match state.tripped_at {
            Some(tripped_at) if now.duration_since(tripped_at) < self.config.cooldown => false,
            _ => {
                state.tripped_at = Some(now);
                tracing::info!("circuit breaker admitting trial request");
                true
            }
        }
    }

    /// Records a call that reached a healthy upstream.
    pub fn record_success(&self) {
        let mut state = self.lock();
        if state.open {
            tracing::info!("circuit breaker closed");
        }
        *state = BreakerState::default();
    }

    /// Records an upstream failure.
    ///
    /// Returns true if this failure opened the breaker, either by reaching
    /// the threshold or by failing a trial call.
    pub fn record_failure(&self) -> bool {
        let mut state = self.lock();
        state.consecutive_failures = state.consecutive_failures.saturating_add(1);

        if state.open {
            state.tripped_at = Some(Instant::now());
            tracing::warn!(
                failure_count = state.consecutive_failures,
                "circuit breaker trial failed, reopening"
            );
            return true;
        }

        if state.consecutive_failures >= self.config.failure_threshold {
            state.open = true;
            state.tripped_at = Some(Instant::now());
            tracing::warn!(
                failure_count = state.consecutive_failures,
                threshold = self.config.failure_threshold,
                "circuit breaker opened"
            );
            return true;
        }

        false
    }

    /// Returns the current state.
    pub fn status(&self) -> BreakerStatus {
        let state = self.lock();
        if !state.open {
            return BreakerStatus::Closed;
        }
        match state.tripped_at {
            Some(tripped_at) if tripped_at.elapsed() < self.config.cooldown => BreakerStatus::Open,
            _ => BreakerStatus::Probing,
        }
    }

    /// Returns the current consecutive failure count.
    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown: Duration::from_secs(cooldown_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn opens_at_threshold() {
        let breaker = breaker(3, 30);

        assert!(!breaker.record_failure());
        assert!(!breaker.record_failure());
        assert_eq!(breaker.status(), BreakerStatus::Closed);
        assert!(breaker.allow_request());

        assert!(breaker.record_failure());
        assert_eq!(breaker.status(), BreakerStatus::Open);
        assert!(!breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_failure_count() {
        let breaker = breaker(3, 30);

        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.status(), BreakerStatus::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn admits_single_trial_after_cooldown() {
        let breaker = breaker(1, 30);
        breaker.record_failure();

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(breaker.status(), BreakerStatus::Probing);
        assert!(breaker.allow_request());

        // Trial in flight; everyone else is still rejected
        assert!(!breaker.allow_request());
        assert_eq!(breaker.status(), BreakerStatus::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn trial_success_closes() {
        let breaker = breaker(2, 10);
        breaker.record_failure();
        breaker.record_failure();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(breaker.allow_request());
        breaker.record_success();

        assert_eq!(breaker.status(), BreakerStatus::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn trial_failure_reopens_with_fresh_cooldown() {
        let breaker = breaker(2, 10);
        breaker.record_failure();
        breaker.record_failure();

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(breaker.allow_request());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(breaker.record_failure());
        assert_eq!(breaker.status(), BreakerStatus::Open);

        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(!breaker.allow_request());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(breaker.allow_request());
    }

    #[test]
    fn zero_threshold_is_treated_as_one() {
        let breaker = breaker(0, 30);
        assert_eq!(breaker.config().failure_threshold, 1);
    }
}
