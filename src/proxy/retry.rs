//! Retry policy as an explicit, reusable value.
//!
//! Encoding {max_retries, backoff} once keeps the non-retryable status
//! classification (401/502/4xx) consistent across every call site instead of
//! being re-inlined per call.

use std::time::Duration;

/// Exponential backoff policy: `base_delay * 2^attempt` between attempts.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Total attempts a retryable failure is allowed to consume.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Backoff delay after the given zero-based attempt. Exponent is clamped
    /// so a misconfigured ceiling cannot overflow the multiplier.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let multiplier = 2u64.pow(attempt.min(5));
        self.base_delay * multiplier as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_reference_behavior() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 2);
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_exponent_is_clamped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(5), policy.delay_for(40));
    }
}
