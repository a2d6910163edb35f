//! A shared circuit breaker protecting the embedding service, grounded on
//! `utils/circuit_breaker.py`'s closed/open/half-open state machine.
//!
//! One instance is shared across both the text and code models, each
//! tripping independently so a failing code model doesn't block text search.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum State {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl State {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

/// Closed -> Open after `failure_threshold` consecutive failures. Open ->
/// HalfOpen after `recovery_timeout` elapses. HalfOpen -> Closed on the
/// first success, or back to Open on failure.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    state: AtomicU8,
    failure_count: AtomicU32,
    opened_at: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            state: AtomicU8::new(State::Closed as u8),
            failure_count: AtomicU32::new(0),
            opened_at: Mutex::new(None),
        }
    }

    /// Default configuration: threshold 5, recovery 60s.
    #[must_use]
    pub fn default_config() -> Self {
        Self::new(5, Duration::from_secs(60))
    }

    fn state(&self) -> State {
        match self.state.load(Ordering::SeqCst) {
            0 => State::Closed,
            1 => State::Open,
            _ => State::HalfOpen,
        }
    }

    /// Whether a call is currently allowed. Open transitions to HalfOpen
    /// (and the call is allowed as the probe) once `recovery_timeout` has
    /// elapsed since the breaker opened.
    pub fn can_execute(&self) -> bool {
        match self.state() {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                let elapsed = self
                    .opened_at
                    .lock()
                    .expect("circuit breaker mutex poisoned")
                    .map(|t| t.elapsed());
                if elapsed.is_some_and(|e| e >= self.recovery_timeout) {
                    self.state.store(State::HalfOpen as u8, Ordering::SeqCst);
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
        self.state.store(State::Closed as u8, Ordering::SeqCst);
        *self.opened_at.lock().expect("circuit breaker mutex poisoned") = None;
    }

    pub fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if matches!(self.state(), State::HalfOpen) || count >= self.failure_threshold {
            self.state.store(State::Open as u8, Ordering::SeqCst);
            *self.opened_at.lock().expect("circuit breaker mutex poisoned") = Some(Instant::now());
        }
    }

    #[must_use]
    pub fn state_str(&self) -> &'static str {
        self.state().as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        assert!(breaker.can_execute());
        breaker.record_failure();
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_failure();
        assert!(!breaker.can_execute());
        assert_eq!(breaker.state_str(), "open");
    }

    #[test]
    fn half_open_failure_reopens() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure();
        assert!(!breaker.can_execute());
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.can_execute());
        assert_eq!(breaker.state_str(), "half_open");
        breaker.record_failure();
        assert!(!breaker.can_execute());
    }

    #[test]
    fn success_closes_from_half_open() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(1));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.can_execute());
        breaker.record_success();
        assert_eq!(breaker.state_str(), "closed");
    }
}
