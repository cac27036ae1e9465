//! Client configuration types.

use std::time::Duration;

/// Retry configuration for failed requests
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts after the first call
    pub max_retries: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Growth factor between consecutive delays
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryPolicy {
    /// Create a new retry policy with default settings
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }

    /// A policy that never retries
    #[must_use]
    pub const fn none() -> Self {
        Self::new().max_retries(0)
    }

    /// Set maximum retries
    #[must_use]
    pub const fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set initial delay
    #[must_use]
    pub const fn initial_delay(mut self, duration: Duration) -> Self {
        self.initial_delay = duration;
        self
    }

    /// Set maximum delay
    #[must_use]
    pub const fn max_delay(mut self, duration: Duration) -> Self {
        self.max_delay = duration;
        self
    }

    /// Set the backoff multiplier
    #[must_use]
    pub const fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Calculate the delay before retry number `attempt` (zero-based)
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let initial = self.initial_delay.as_millis() as f64;
        let max = self.max_delay.as_millis() as f64;
        let delay = (initial * self.multiplier.max(1.0).powi(exponent)).min(max);
        Duration::from_millis(delay.round() as u64)
    }

    /// Delays between attempts, one per allowed retry
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|attempt| self.backoff_for(attempt))
    }
}

/// Token-bucket settings for the zone API
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Tokens available per window
    pub capacity: u32,

    /// Interval after which the bucket is refilled to capacity
    pub refill_interval: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            capacity: 3,
            refill_interval: Duration::from_secs(1),
        }
    }
}
