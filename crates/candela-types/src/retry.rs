//! Retry budget with exponential backoff.

use std::time::Duration;

/// Retry budget shared by the REST client, flush retries and reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds).
    pub base_delay_ms: u64,
    /// Maximum delay between retries (in milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay_ms: 0,
        max_delay_ms: 0,
    };

    /// Sets the maximum number of retries.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub const fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub const fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Returns the total number of attempts, including the first.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Returns true if another retry is allowed after `attempt` retries.
    #[must_use]
    pub const fn allows_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Calculates the delay before retry number `attempt` (1-based).
    ///
    /// Exponential backoff `base * 2^attempt`, capped at the maximum, plus a
    /// deterministic jitter of up to 25%.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }

        let exp_delay = self.base_delay_ms.saturating_mul(1u64 << attempt.min(10));
        let capped_delay = exp_delay.min(self.max_delay_ms);

        let jitter_range = capped_delay / 4;
        let jitter = if jitter_range > 0 {
            (u64::from(attempt) * 17) % jitter_range
        } else {
            0
        };

        Duration::from_millis(capped_delay.saturating_add(jitter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.max_attempts(), 6);
        assert!(policy.allows_retry(4));
        assert!(!policy.allows_retry(5));
    }

    #[test]
    fn test_backoff_delay_calculation() {
        let policy = RetryPolicy::default();

        // base_delay * 2 = 1000ms plus jitter
        let delay1 = policy.backoff_delay(1);
        assert!(delay1.as_millis() >= 1000 && delay1.as_millis() <= 1250);

        // base_delay * 4 = 2000ms plus jitter
        let delay2 = policy.backoff_delay(2);
        assert!(delay2.as_millis() >= 2000 && delay2.as_millis() <= 2500);

        // capped at max_delay plus jitter
        let delay_high = policy.backoff_delay(20);
        assert!(delay_high.as_millis() <= 37_500);
    }

    #[test]
    fn test_no_delay_policy() {
        assert_eq!(RetryPolicy::NONE.backoff_delay(3), Duration::ZERO);
        assert!(!RetryPolicy::NONE.allows_retry(0));
        let quick = RetryPolicy::NONE.with_max_retries(3);
        assert!(quick.allows_retry(2));
        assert_eq!(quick.backoff_delay(1), Duration::ZERO);
    }
}
