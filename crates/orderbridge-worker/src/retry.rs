//! Retry backoff policy.

use std::time::Duration;

use orderbridge_core::config::worker::WorkerConfig;

/// Linear backoff: the delay before attempt `n+1` is `base × n`.
///
/// The contract required by the queue is only that the delay never
/// decreases with the attempt number, so repeated contention backs off
/// instead of hot-looping.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the given base delay.
    pub fn new(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Build the policy from worker configuration.
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(Duration::from_secs(config.retry_base_delay_seconds))
    }

    /// Delay before the next run, given the number of attempts so far.
    pub fn delay_for(&self, attempts: i32) -> Duration {
        self.base_delay * attempts.max(1) as u32
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy::new(Duration::from_secs(30));
        assert_eq!(policy.delay_for(1), Duration::from_secs(30));
        assert_eq!(policy.delay_for(2), Duration::from_secs(60));
        assert_eq!(policy.delay_for(3), Duration::from_secs(90));
    }

    #[test]
    fn backoff_is_monotonic_non_decreasing() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for attempts in 1..50 {
            let delay = policy.delay_for(attempts);
            assert!(delay >= previous);
            previous = delay;
        }
    }

    #[test]
    fn zero_and_negative_attempts_are_clamped() {
        let policy = RetryPolicy::new(Duration::from_secs(30));
        assert_eq!(policy.delay_for(0), Duration::from_secs(30));
        assert_eq!(policy.delay_for(-1), Duration::from_secs(30));
    }
}
