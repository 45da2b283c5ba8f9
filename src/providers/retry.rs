//! Retry configuration and the retrying provider decorator.
//!
//! Only transient errors are retried (see
//! [`GemgateError::is_transient()`](crate::GemgateError::is_transient)),
//! which in practice means an overloaded service (HTTP 503). Everything else
//! surfaces immediately.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use super::traits::GenerateProvider;
use crate::Result;
use crate::telemetry;
use crate::types::{GenerateRequest, GenerationResponse};

/// Configuration for retry behaviour on transient errors.
///
/// ```rust
/// # use gemgate::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(3)
///     .backoff(Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 2 (a single retry).
    pub max_attempts: u32,
    /// Fixed delay between attempts. Default: 10 s.
    pub backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the delay between attempts.
    pub fn backoff(mut self, delay: Duration) -> Self {
        self.backoff = delay;
        self
    }
}

/// Execute an async operation with retry logic.
///
/// Permanent errors are returned immediately without retry. After the last
/// attempt the final transient error is returned.
pub(crate) async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    provider_name: &str,
    f: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < attempts => {
                metrics::counter!(telemetry::RETRIES_TOTAL).increment(1);
                warn!(
                    provider = provider_name,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = config.backoff.as_millis() as u64,
                    error = %e,
                    "retrying after transient error"
                );
                tokio::time::sleep(config.backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Decorator that wraps a [`GenerateProvider`] with retry logic.
pub struct RetryingProvider {
    inner: Arc<dyn GenerateProvider>,
    config: RetryConfig,
}

impl RetryingProvider {
    /// Wrap a provider with retry logic.
    pub fn new(inner: Arc<dyn GenerateProvider>, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// The wrapped provider.
    pub fn inner(&self) -> &Arc<dyn GenerateProvider> {
        &self.inner
    }
}

#[async_trait]
impl GenerateProvider for RetryingProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn has_credential(&self) -> bool {
        self.inner.has_credential()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse> {
        with_retry(&self.config, self.inner.name(), || self.inner.generate(request)).await
    }
}
