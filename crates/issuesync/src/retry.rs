//! Backoff configuration shared by the drive loop and store writes.

use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBackoff, ExponentialBuilder};
use serde::{Deserialize, Serialize};

/// Default initial backoff delay in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1_000;
/// Default backoff ceiling in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 30_000;
/// Default number of retries after the first attempt.
pub const MAX_RETRIES: usize = 3;

/// Configuration for retry operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Minimum delay between retries, in milliseconds.
    pub min_delay_ms: u64,
    /// Maximum delay between retries, in milliseconds.
    pub max_delay_ms: u64,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
    /// Whether to add jitter to delays.
    pub with_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: INITIAL_BACKOFF_MS,
            max_delay_ms: MAX_BACKOFF_MS,
            max_retries: MAX_RETRIES,
            with_jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new retry configuration with custom values.
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay_ms: min_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            max_retries,
            with_jitter: true,
        }
    }

    /// Set whether to use jitter.
    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.with_jitter = jitter;
        self
    }

    pub fn min_delay(&self) -> Duration {
        Duration::from_millis(self.min_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Build an exponential backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        let mut builder = ExponentialBuilder::default()
            .with_min_delay(self.min_delay())
            .with_max_delay(self.max_delay())
            .with_max_times(self.max_retries);

        if self.with_jitter {
            builder = builder.with_jitter();
        }

        builder
    }

    /// Iterator over the delays to sleep before each retry.
    ///
    /// Yields at most `max_retries` items; exhaustion means give up.
    #[must_use]
    pub fn delays(&self) -> ExponentialBackoff {
        self.clone().into_backoff().build()
    }
}
