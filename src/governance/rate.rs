//! Client-side rate governor.
//!
//! Tracks timestamps of accepted requests and answers whether another one may
//! be issued now. It is advisory: nothing here blocks or queues. The caller
//! consults [`RateGovernor::can_make_request`], fails the call if denied, and
//! otherwise calls [`RateGovernor::record_request`].
//!
//! Check and record are separate steps, so a burst of concurrent callers can
//! all pass the check before any of them records. The queue's own spacing
//! bounds the damage.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Length of the rolling window for the per-minute ceiling.
const WINDOW: Duration = Duration::from_secs(60);

/// Limits enforced by [`RateGovernor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateConfig {
    /// Maximum accepted requests in any trailing 60 s. Default: 15.
    pub max_requests_per_minute: usize,
    /// Minimum spacing between accepted requests. Default: 4 s.
    pub min_request_interval: Duration,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            max_requests_per_minute: 15,
            min_request_interval: Duration::from_millis(4000),
        }
    }
}

impl RateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_requests_per_minute(mut self, n: usize) -> Self {
        self.max_requests_per_minute = n;
        self
    }

    pub fn min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// How long to wait before a new request would be allowed. Zero when allowed.
    pub wait: Duration,
}

impl RateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            wait: Duration::ZERO,
        }
    }

    fn deny(wait: Duration) -> Self {
        Self {
            allowed: false,
            wait,
        }
    }
}

/// Point-in-time view of the governor, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSnapshot {
    pub max_requests_per_minute: usize,
    /// Accepted requests within the trailing 60 s.
    pub requests_in_window: usize,
    /// Remaining wait if a request were attempted now.
    pub wait: Duration,
}

/// Advisory limiter combining a minimum interval with a per-minute ceiling.
///
/// Shared by reference; all state sits behind one mutex.
pub struct RateGovernor {
    config: RateConfig,
    history: Mutex<VecDeque<Instant>>,
}

impl RateGovernor {
    pub fn new(config: RateConfig) -> Self {
        Self {
            config,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn config(&self) -> &RateConfig {
        &self.config
    }

    fn history(&self) -> MutexGuard<'_, VecDeque<Instant>> {
        self.history.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prune(history: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = history.front() {
            if now.duration_since(oldest) >= WINDOW {
                history.pop_front();
            } else {
                break;
            }
        }
    }

    fn decide(&self, history: &VecDeque<Instant>, now: Instant) -> RateDecision {
        let mut wait = Duration::ZERO;

        if let Some(&last) = history.back() {
            let since = now.duration_since(last);
            if since < self.config.min_request_interval {
                wait = wait.max(self.config.min_request_interval - since);
            }
        }

        if history.len() >= self.config.max_requests_per_minute {
            // Room frees up once enough of the oldest records leave the window.
            let excess = history.len() + 1 - self.config.max_requests_per_minute;
            let ceiling_wait = match history.get(excess - 1) {
                Some(&freeing) => (freeing + WINDOW).saturating_duration_since(now),
                None => WINDOW,
            };
            wait = wait.max(ceiling_wait.max(Duration::from_millis(1)));
        }

        if wait.is_zero() {
            RateDecision::allow()
        } else {
            RateDecision::deny(wait)
        }
    }

    /// Whether a request may be issued now, and if not, how long to wait.
    pub fn can_make_request(&self) -> RateDecision {
        let now = Instant::now();
        let mut history = self.history();
        Self::prune(&mut history, now);
        self.decide(&history, now)
    }

    /// Record that a request was issued now.
    pub fn record_request(&self) {
        let now = Instant::now();
        let mut history = self.history();
        Self::prune(&mut history, now);
        history.push_back(now);
    }

    pub fn snapshot(&self) -> RateSnapshot {
        let now = Instant::now();
        let mut history = self.history();
        Self::prune(&mut history, now);
        let decision = self.decide(&history, now);
        RateSnapshot {
            max_requests_per_minute: self.config.max_requests_per_minute,
            requests_in_window: history.len(),
            wait: decision.wait,
        }
    }

    /// Forget all recorded requests.
    pub fn reset(&self) {
        self.history().clear();
    }
}
