//! Exponential backoff for fills that failed in transport.

use std::time::Duration;

use peerswap_types::RetryConfig;
use rand::Rng;

/// How many times to try a fill and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first. Never below 1.
    pub max_attempts: u32,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// `0.0` for exact delays; otherwise each delay grows by up to this fraction.
    /// Read as `0.0` when not finite, and clamped to `0.0..=1.0`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            min_delay: Duration::from_millis(config.min_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            jitter: 0.2,
        }
    }
}

impl RetryPolicy {
    /// A single attempt.
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = sanitize_jitter(jitter);
        self
    }

    /// Delay after failed attempt `attempt` (0-indexed):
    /// `min(min_delay * 2^attempt, max_delay)`, plus jitter, capped at `max_delay`.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let capped = self.min_delay.saturating_mul(factor).min(self.max_delay);
        let jitter = sanitize_jitter(self.jitter);
        if jitter <= 0.0 {
            return capped;
        }
        let fraction: f64 = rand::thread_rng().gen_range(0.0..1.0);
        capped.mul_f64(1.0 + fraction * jitter).min(self.max_delay)
    }
}

fn sanitize_jitter(jitter: f64) -> f64 {
    if jitter.is_finite() {
        jitter.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
