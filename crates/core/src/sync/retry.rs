//! Exponential backoff for outbox retries.

use std::time::Duration;

use adminsync_domain::DrainConfig;
use chrono::{DateTime, Utc};
use rand::Rng;

/// Retry schedule applied by the drainer.
///
/// The delay before attempt `n` (1-based) is `min(base * 2^(n-1), cap)`.
/// With `jitter` enabled the delay is drawn uniformly from `[0, delay]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&DrainConfig::default())
    }
}

impl From<&DrainConfig> for RetryPolicy {
    fn from(config: &DrainConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            base_delay: Duration::from_millis(config.backoff_base_ms),
            max_delay: Duration::from_millis(config.backoff_max_ms),
            jitter: false,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Capped delay for the given attempt number, before jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// When a record making its `attempt`-th drain attempt becomes due again.
    pub fn next_retry_at(&self, attempt: u32, now: DateTime<Utc>) -> DateTime<Utc> {
        let mut delay = self.delay_for(attempt);
        if self.jitter && !delay.is_zero() {
            let millis = rand::thread_rng().gen_range(0..=delay.as_millis() as u64);
            delay = Duration::from_millis(millis);
        }
        chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delay| now.checked_add_signed(delay))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// True once a record has used up its automatic attempts.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}
