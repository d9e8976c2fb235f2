//! Retry count and capped exponential backoff for failed fetches

use std::time::Duration;

/// Default number of retries after the first failed attempt
pub const DEFAULT_RETRIES: u32 = 2;
/// Default backoff base
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);
/// Default backoff cap
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Never retry
    pub fn none() -> Self {
        Self {
            retries: 0,
            ..Self::default()
        }
    }

    /// Whether another attempt follows `failures` consecutive failures
    pub fn should_retry(&self, failures: u32) -> bool {
        failures <= self.retries
    }

    /// Delay before the next attempt after `failures` consecutive failures:
    /// `min(base * 2^failures, max)`
    pub fn delay(&self, failures: u32) -> Duration {
        let factor = 2_u32.checked_pow(failures).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}
