use std::time::Duration;

/// Bounded retry with exponential backoff for commit-time conflicts and
/// backend failures. Validation failures are never retried.
#[derive(Debug, Copy, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first (minimum 1).
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `base_backoff * 2^(n-1)`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_backoff: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    /// Policy without sleeps, for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff: Duration::ZERO,
        }
    }

    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_backoff.saturating_mul(1 << shift)
    }

    /// Sleep before the attempt after `attempt` (1-based).
    pub fn pause_after(&self, attempt: u32) {
        let delay = self.backoff_delay(attempt);
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_backoff: Duration::from_millis(10),
        };
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(10));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(20));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(40));
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        let policy = RetryPolicy::immediate(3);
        assert_eq!(policy.backoff_delay(2), Duration::ZERO);
    }
}
