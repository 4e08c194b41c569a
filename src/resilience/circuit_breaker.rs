//! # Database Circuit Breaker
//!
//! Compact atomic circuit breaker guarding the analytics database. Repeated
//! query failures open the circuit so handlers fail fast instead of queueing
//! on a struggling database; after a recovery timeout a trial request is let
//! through (half-open) before the circuit closes again.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => CircuitState::Closed,
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseCircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    current_failures: Arc<AtomicU32>,
    /// Seconds since UNIX epoch of the failure that opened the circuit.
    last_failure_time: Arc<AtomicU64>,
    state: Arc<AtomicU8>,
    component_name: String,
}

impl DatabaseCircuitBreaker {
    pub fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        component_name: impl Into<String>,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            current_failures: Arc::new(AtomicU32::new(0)),
            last_failure_time: Arc::new(AtomicU64::new(0)),
            state: Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            component_name: component_name.into(),
        }
    }

    /// A breaker that never opens, for tests and disabled configurations.
    pub fn disabled() -> Self {
        Self::new(u32::MAX, Duration::from_secs(1), "disabled")
    }

    /// Whether the circuit is currently rejecting requests.
    ///
    /// Also performs the Open -> HalfOpen transition once the recovery
    /// timeout has elapsed.
    pub fn is_circuit_open(&self) -> bool {
        match CircuitState::from(self.state.load(Ordering::Relaxed)) {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => false,
            CircuitState::Open => {
                let now = current_timestamp();
                let last_failure = self.last_failure_time.load(Ordering::Relaxed);

                if now.saturating_sub(last_failure) >= self.recovery_timeout.as_secs() {
                    debug!(
                        component = %self.component_name,
                        "Circuit breaker transitioning to half-open for recovery testing"
                    );
                    self.state
                        .store(CircuitState::HalfOpen as u8, Ordering::Relaxed);
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Reset failure count and close the circuit.
    pub fn record_success(&self) {
        let previous_failures = self.current_failures.swap(0, Ordering::Relaxed);
        let previous_state = CircuitState::from(
            self.state
                .swap(CircuitState::Closed as u8, Ordering::Relaxed),
        );

        if previous_failures > 0 || previous_state != CircuitState::Closed {
            debug!(
                component = %self.component_name,
                previous_failures = previous_failures,
                previous_state = ?previous_state,
                "Circuit breaker recovered, closed"
            );
        }
    }

    /// Count a failure, opening the circuit at the threshold.
    pub fn record_failure(&self) {
        let failures = self.current_failures.fetch_add(1, Ordering::Relaxed) + 1;

        if failures >= self.failure_threshold {
            let previous_state =
                CircuitState::from(self.state.swap(CircuitState::Open as u8, Ordering::Relaxed));
            self.last_failure_time
                .store(current_timestamp(), Ordering::Relaxed);

            if previous_state != CircuitState::Open {
                warn!(
                    component = %self.component_name,
                    failures = failures,
                    threshold = self.failure_threshold,
                    recovery_timeout_secs = self.recovery_timeout.as_secs(),
                    "Circuit breaker opened after repeated failures"
                );
            }
        } else {
            debug!(
                component = %self.component_name,
                failures = failures,
                threshold = self.failure_threshold,
                "Recorded database operation failure"
            );
        }
    }

    pub fn current_state(&self) -> CircuitState {
        CircuitState::from(self.state.load(Ordering::Relaxed))
    }

    pub fn current_failures(&self) -> u32 {
        self.current_failures.load(Ordering::Relaxed)
    }
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_closed() {
        let cb = DatabaseCircuitBreaker::new(3, Duration::from_secs(5), "test");
        assert!(!cb.is_circuit_open());
        assert_eq!(cb.current_state(), CircuitState::Closed);
    }

    #[test]
    fn opens_after_threshold_failures() {
        let cb = DatabaseCircuitBreaker::new(3, Duration::from_secs(5), "test");

        cb.record_failure();
        cb.record_failure();
        assert!(!cb.is_circuit_open());

        cb.record_failure();
        assert!(cb.is_circuit_open());
        assert_eq!(cb.current_state(), CircuitState::Open);
    }

    #[test]
    fn success_resets_failures_and_closes() {
        let cb = DatabaseCircuitBreaker::new(2, Duration::from_secs(5), "test");

        cb.record_failure();
        cb.record_failure();
        assert!(cb.is_circuit_open());

        cb.record_success();
        assert!(!cb.is_circuit_open());
        assert_eq!(cb.current_failures(), 0);
    }

    #[test]
    fn transitions_to_half_open_after_timeout() {
        let cb = DatabaseCircuitBreaker::new(1, Duration::from_secs(0), "test");

        cb.record_failure();
        // Zero-second recovery timeout means the very next check half-opens.
        assert!(!cb.is_circuit_open());
        assert_eq!(cb.current_state(), CircuitState::HalfOpen);
    }

    #[test]
    fn disabled_breaker_never_opens() {
        let cb = DatabaseCircuitBreaker::disabled();
        for _ in 0..1000 {
            cb.record_failure();
        }
        assert!(!cb.is_circuit_open());
    }
}
