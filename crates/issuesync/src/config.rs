//! Engine tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::platform::rate_limits;
use crate::retry::RetryConfig;

/// Default page size when the caller does not specify one.
pub const DEFAULT_BATCH_SIZE: u32 = 50;
/// Largest page size accepted from callers.
pub const MAX_BATCH_SIZE: u32 = 100;
/// Sync starts allowed per actor within one rate-gate period.
pub const DEFAULT_RATE_GATE_QUOTA: u32 = 5;
/// Rate-gate rolling window.
pub const DEFAULT_RATE_GATE_PERIOD_MS: u64 = 60_000;
/// Cumulative time a single job may spend waiting on remote rate limits.
pub const DEFAULT_MAX_RATE_LIMIT_WAIT_MS: u64 = 15 * 60 * 1_000;
/// Whole-job wall-clock limit.
pub const DEFAULT_JOB_TIMEOUT_MS: u64 = 30 * 60 * 1_000;

/// Every tunable of the sync engine.
///
/// Durations are stored as millisecond integers so the struct maps directly
/// onto TOML tables and environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_batch_size: u32,
    pub max_batch_size: u32,
    /// Backoff for transient page failures.
    pub page_retry: RetryConfig,
    pub max_rate_limit_wait_ms: u64,
    pub job_timeout_ms: u64,
    pub rate_gate_quota: u32,
    pub rate_gate_period_ms: u64,
    /// Proactive pacing of GitHub requests.
    pub github_requests_per_second: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_batch_size: DEFAULT_BATCH_SIZE,
            max_batch_size: MAX_BATCH_SIZE,
            page_retry: RetryConfig::default(),
            max_rate_limit_wait_ms: DEFAULT_MAX_RATE_LIMIT_WAIT_MS,
            job_timeout_ms: DEFAULT_JOB_TIMEOUT_MS,
            rate_gate_quota: DEFAULT_RATE_GATE_QUOTA,
            rate_gate_period_ms: DEFAULT_RATE_GATE_PERIOD_MS,
            github_requests_per_second: rate_limits::GITHUB_DEFAULT_RPS,
        }
    }
}

impl EngineConfig {
    pub fn max_rate_limit_wait(&self) -> Duration {
        Duration::from_millis(self.max_rate_limit_wait_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }

    pub fn rate_gate_period(&self) -> Duration {
        Duration::from_millis(self.rate_gate_period_ms)
    }
}
