//! Offline circuit breaker.
//!
//! Counts consecutive failures. Once `failure_threshold` is reached the
//! breaker goes [`BreakerState::Offline`] and the facade serves synthetic
//! answers instead of calling the service. Recovery is lazy: there is no
//! background timer, the next [`OfflineBreaker::should_use_offline_mode`]
//! call after the cooldown (measured from the last failure) flips it back.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::telemetry;

/// Thresholds for [`OfflineBreaker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive failures before going offline. Default: 3.
    pub failure_threshold: u32,
    /// Time after the last failure before going back online. Default: 5 min.
    pub cooldown: Duration,
    /// Whether failed network calls (after retry) count as failures.
    /// When false, only rate-governor denials do. Default: true.
    pub trip_on_upstream_errors: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(5 * 60),
            trip_on_upstream_errors: true,
        }
    }
}

impl BreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn trip_on_upstream_errors(mut self, enabled: bool) -> Self {
        self.trip_on_upstream_errors = enabled;
        self
    }
}

/// Whether requests go to the service or to the offline responder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests go to the network.
    Online,
    /// Requests get synthetic answers until the cooldown elapses.
    Offline,
}

/// Point-in-time view of the breaker, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerSnapshot {
    pub state: BreakerState,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    /// Time until lazy recovery, if currently offline.
    pub offline_remaining: Option<Duration>,
}

#[derive(Debug)]
struct FailureState {
    consecutive_failures: u32,
    last_failure_at: Option<Instant>,
    state: BreakerState,
}

/// Consecutive-failure circuit breaker with lazy cooldown recovery and
/// manual overrides.
pub struct OfflineBreaker {
    config: BreakerConfig,
    state: Mutex<FailureState>,
}

impl OfflineBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(FailureState {
                consecutive_failures: 0,
                last_failure_at: None,
                state: BreakerState::Online,
            }),
        }
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, FailureState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_failure(&self) {
        let mut st = self.lock();
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        st.last_failure_at = Some(Instant::now());
        if st.state == BreakerState::Online
            && st.consecutive_failures >= self.config.failure_threshold
        {
            st.state = BreakerState::Offline;
            metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL, "to" => "offline")
                .increment(1);
            warn!(
                failures = st.consecutive_failures,
                cooldown_secs = self.config.cooldown.as_secs(),
                "switching to offline mode"
            );
        }
    }

    /// Reset the failure count and go online immediately.
    pub fn record_success(&self) {
        let mut st = self.lock();
        st.consecutive_failures = 0;
        if st.state == BreakerState::Offline {
            st.state = BreakerState::Online;
            metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL, "to" => "online").increment(1);
            info!("back online after successful request");
        }
    }

    /// Whether callers should use synthetic answers right now.
    ///
    /// Performs lazy recovery once the cooldown has elapsed.
    pub fn should_use_offline_mode(&self) -> bool {
        let mut st = self.lock();
        if st.state == BreakerState::Online {
            return false;
        }
        let cooled_down = st
            .last_failure_at
            .is_none_or(|at| at.elapsed() >= self.config.cooldown);
        if cooled_down {
            st.state = BreakerState::Online;
            st.consecutive_failures = 0;
            metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL, "to" => "online").increment(1);
            info!("offline cooldown elapsed, retrying service");
            return false;
        }
        true
    }

    /// Manual override: go online and forget past failures.
    pub fn force_online(&self) {
        let mut st = self.lock();
        st.consecutive_failures = 0;
        st.last_failure_at = None;
        if st.state == BreakerState::Offline {
            st.state = BreakerState::Online;
            metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL, "to" => "online").increment(1);
            info!("offline mode cleared manually");
        }
    }

    /// Manual override: go offline for one cooldown period starting now.
    pub fn force_offline(&self) {
        let mut st = self.lock();
        st.last_failure_at = Some(Instant::now());
        if st.state == BreakerState::Online {
            st.state = BreakerState::Offline;
            metrics::counter!(telemetry::BREAKER_TRANSITIONS_TOTAL, "to" => "offline")
                .increment(1);
            info!("offline mode forced manually");
        }
    }

    /// Current state without triggering lazy recovery.
    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let st = self.lock();
        let offline_remaining = match (st.state, st.last_failure_at) {
            (BreakerState::Offline, Some(at)) => {
                Some(self.config.cooldown.saturating_sub(at.elapsed()))
            }
            (BreakerState::Offline, None) => Some(Duration::ZERO),
            (BreakerState::Online, _) => None,
        };
        BreakerSnapshot {
            state: st.state,
            consecutive_failures: st.consecutive_failures,
            failure_threshold: self.config.failure_threshold,
            offline_remaining,
        }
    }
}
