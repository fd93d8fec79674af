//! Bounded retry with exponential backoff for provider errors.
//!
//! Only [`ErrorKind::Transient`](crate::ErrorKind::Transient) errors are
//! retried. With the defaults (5 attempts, 1s initial delay) the waits are
//! 1s, 2s, 4s and 8s, so a query gives up after 15 seconds of backoff.

use std::time::Duration;

/// Default number of attempts per query, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default wait before the second attempt.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single wait.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// How many times to try a query and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}

impl RetryPolicy {
    /// Creates a policy. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: max_delay.max(initial_delay),
        }
    }

    /// A policy that tries each query exactly once.
    #[must_use]
    pub const fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Maximum attempts per query, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before 1-based attempt `attempt`. Zero for the first attempt,
    /// then `initial_delay * 2^(attempt - 2)` capped at `max_delay`.
    #[must_use]
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 2);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_backoff_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_secs(1));
        assert_eq!(policy.delay_before(3), Duration::from_secs(2));
        assert_eq!(policy.delay_before(4), Duration::from_secs(4));
        assert_eq!(policy.delay_before(5), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy::new(50, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.delay_before(7), Duration::from_secs(30));
        assert_eq!(policy.delay_before(50), Duration::from_secs(30));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
    }
}
