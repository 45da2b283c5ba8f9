//! Request governance primitives.
//!
//! | Component | Role |
//! |-----------|------|
//! | [`rate::RateGovernor`] | advisory check: minimum spacing and per-minute ceiling |
//! | [`breaker::OfflineBreaker`] | consecutive-failure counter that switches to offline mode |
//! | [`queue::RequestQueue`] | FIFO executor with bounded concurrency and post-call spacing |
//!
//! All timing uses `tokio::time::Instant`, so tests drive these with a paused
//! runtime clock instead of real delays.

pub mod breaker;
pub mod queue;
pub mod rate;

pub use breaker::{BreakerConfig, BreakerSnapshot, BreakerState, OfflineBreaker};
pub use queue::{QueueConfig, RequestQueue};
pub use rate::{RateConfig, RateDecision, RateGovernor, RateSnapshot};
