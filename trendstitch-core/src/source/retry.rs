//! Retry policy and clock.
//!
//! Transient fetch failures are retried with a linearly increasing delay:
//! attempt `n` (0-based) waits `base + step * n`. The sleep itself goes
//! through [`Clock`] so tests can record delays instead of waiting.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;

/// Linear backoff with a fixed retry cap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub base_delay_secs: f64,
    pub step_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 60.0,
            step_secs: 5.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0 = first retry).
    pub fn delay(&self, attempt: u32) -> Duration {
        let secs = self.base_delay_secs + self.step_secs * f64::from(attempt);
        Duration::from_secs_f64(secs.max(0.0))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    pub fn is_valid(&self) -> bool {
        self.base_delay_secs.is_finite()
            && self.step_secs.is_finite()
            && self.base_delay_secs >= 0.0
            && self.step_secs >= 0.0
    }
}

/// Blocking sleep. No cancellation hook.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Real clock backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Clock that records requested sleeps and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingClock {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every sleep requested so far, in order (zero-length sleeps included).
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Clock for RecordingClock {
    fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_is_linear_from_sixty_seconds() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay(0), Duration::from_secs(60));
        assert_eq!(p.delay(1), Duration::from_secs(65));
        assert_eq!(p.delay(2), Duration::from_secs(70));
        assert_eq!(p.max_attempts(), 4);
    }

    #[test]
    fn negative_delays_clamp_to_zero() {
        let p = RetryPolicy {
            max_retries: 1,
            base_delay_secs: -5.0,
            step_secs: 0.0,
        };
        assert_eq!(p.delay(0), Duration::ZERO);
        assert!(!p.is_valid());
    }

    #[test]
    fn recording_clock_keeps_order() {
        let clock = RecordingClock::new();
        clock.sleep(Duration::from_secs(2));
        clock.sleep(Duration::from_secs(1));
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(2), Duration::from_secs(1)]
        );
    }
}
