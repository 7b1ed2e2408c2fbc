//! Per-actor admission control for sync starts.
//!
//! A sliding-window log: each actor may start `quota` syncs within any
//! rolling `period`. State is in-process and lost on restart.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::EngineConfig;

#[derive(Debug)]
pub struct RateGate {
    quota: usize,
    period: Duration,
    admissions: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateGate {
    /// A quota of zero admits nothing.
    pub fn new(quota: u32, period: Duration) -> Self {
        Self {
            quota: quota as usize,
            period,
            admissions: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.rate_gate_quota, config.rate_gate_period())
    }

    /// Record an admission for `actor_id` if the window has room.
    pub fn try_admit(&self, actor_id: &str) -> bool {
        let now = Instant::now();
        let mut admissions = self.admissions.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(log) = admissions.get_mut(actor_id) {
            prune(log, now, self.period);
            if log.is_empty() {
                admissions.remove(actor_id);
            }
        }
        if self.quota == 0 {
            return false;
        }

        let log = admissions.entry(actor_id.to_string()).or_default();
        if log.len() >= self.quota {
            return false;
        }
        log.push_back(now);
        true
    }

    /// Time until `actor_id` may be admitted again; `None` if it may be now.
    ///
    /// A zero quota never admits; the full period is reported.
    pub fn retry_after(&self, actor_id: &str) -> Option<Duration> {
        if self.quota == 0 {
            return Some(self.period);
        }
        let now = Instant::now();
        let mut admissions = self.admissions.lock().unwrap_or_else(|e| e.into_inner());

        let log = admissions.get_mut(actor_id)?;
        prune(log, now, self.period);
        if log.len() < self.quota {
            if log.is_empty() {
                admissions.remove(actor_id);
            }
            return None;
        }

        let oldest = log.front().copied()?;
        Some((oldest + self.period).saturating_duration_since(now))
    }
}

#[cfg(test)]
impl RateGate {
    fn tracked_actors(&self) -> usize {
        self.admissions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Drop admissions that have left the window.
fn prune(log: &mut VecDeque<Instant>, now: Instant, period: Duration) {
    while log
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= period)
    {
        log.pop_front();
    }
}
