//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `gemgate_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: `"text"` or `"image"`
//! - `status`: `"ok"` or `"error"`
//! - `origin`: where a live answer came from: `"network"`, `"cache"`, `"similar"`

/// Total requests answered by the facade (live answers only).
///
/// Labels: `operation`, `origin`.
pub const REQUESTS_TOTAL: &str = "gemgate_requests_total";

/// Network call outcomes after retry.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const UPSTREAM_CALLS_TOTAL: &str = "gemgate_upstream_calls_total";

/// Network call duration in seconds, queue wait excluded.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "gemgate_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
pub const RETRIES_TOTAL: &str = "gemgate_retries_total";

/// Total tokens consumed.
///
/// Labels: `direction` ("prompt" | "completion").
pub const TOKENS_TOTAL: &str = "gemgate_tokens_total";

/// Total cache hits.
///
/// Labels: `kind` ("exact" | "similar").
pub const CACHE_HITS_TOTAL: &str = "gemgate_cache_hits_total";

/// Total exact-key cache misses.
pub const CACHE_MISSES_TOTAL: &str = "gemgate_cache_misses_total";

/// Entries removed to make room for new ones.
pub const CACHE_EVICTIONS_TOTAL: &str = "gemgate_cache_evictions_total";

/// Calls denied by the rate governor.
pub const RATE_LIMITED_TOTAL: &str = "gemgate_rate_limited_total";

/// Synthetic answers served while offline.
///
/// Labels: `template`.
pub const OFFLINE_RESPONSES_TOTAL: &str = "gemgate_offline_responses_total";

/// Breaker state changes.
///
/// Labels: `to` ("online" | "offline").
pub const BREAKER_TRANSITIONS_TOTAL: &str = "gemgate_breaker_transitions_total";
