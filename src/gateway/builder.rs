//! Builder for configuring client instances

use std::sync::Arc;
use std::time::Duration;

use super::GemgateClient;
use crate::cache::{CacheConfig, ResponseCache};
use crate::config::Config;
use crate::governance::{
    BreakerConfig, OfflineBreaker, QueueConfig, RateConfig, RateGovernor, RequestQueue,
};
use crate::providers::gemini::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::providers::{GeminiProvider, GenerateProvider, RetryConfig, SafetyThreshold};
use crate::{GemgateError, Result};

/// Main entry point for creating clients.
pub struct Gemgate;

impl Gemgate {
    /// Create a new builder for configuring the client.
    pub fn builder() -> GemgateBuilder {
        GemgateBuilder::new()
    }
}

/// Builder for configuring client instances.
pub struct GemgateBuilder {
    api_key: Option<String>,
    base_url: Option<String>,
    timeout: Option<Duration>,
    safety_threshold: SafetyThreshold,
    provider: Option<Arc<dyn GenerateProvider>>,
    cache: CacheConfig,
    rate_limit: RateConfig,
    breaker: BreakerConfig,
    queue: QueueConfig,
    retry: RetryConfig,
}

impl GemgateBuilder {
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            timeout: None,
            safety_threshold: SafetyThreshold::default(),
            provider: None,
            cache: CacheConfig::default(),
            rate_limit: RateConfig::default(),
            breaker: BreakerConfig::default(),
            queue: QueueConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    /// Start from a loaded [`Config`]. The API key is not part of the config
    /// file; set it with [`api_key`](Self::api_key).
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: Some(config.gemini.base_url.clone()),
            timeout: Some(Duration::from_secs(config.gemini.timeout_secs)),
            safety_threshold: config.gemini.safety_threshold,
            cache: CacheConfig::from(&config.cache),
            rate_limit: RateConfig::from(&config.rate_limit),
            breaker: BreakerConfig::from(&config.breaker),
            queue: QueueConfig::from(&config.queue),
            retry: RetryConfig::from(&config.retry),
            ..Self::new()
        }
    }

    /// Gemini API key. Without one every live call fails with
    /// [`GemgateError::MissingCredential`].
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the service base URL (for testing with wiremock).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// HTTP timeout per attempt (default: 60 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn safety_threshold(mut self, threshold: SafetyThreshold) -> Self {
        self.safety_threshold = threshold;
        self
    }

    /// Use a custom backend instead of the Gemini transport.
    ///
    /// The key, base URL, timeout and safety settings are ignored when a
    /// provider is injected.
    pub fn provider(mut self, provider: Arc<dyn GenerateProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    pub fn rate_limit(mut self, config: RateConfig) -> Self {
        self.rate_limit = config;
        self
    }

    pub fn breaker(mut self, config: BreakerConfig) -> Self {
        self.breaker = config;
        self
    }

    pub fn queue(mut self, config: QueueConfig) -> Self {
        self.queue = config;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.queue.max_concurrent_requests == 0 {
            return Err(GemgateError::Configuration(
                "queue.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.max_requests_per_minute == 0 {
            return Err(GemgateError::Configuration(
                "rate_limit.max_requests_per_minute must be at least 1".to_string(),
            ));
        }
        if self.cache.max_entries == 0 {
            return Err(GemgateError::Configuration(
                "cache.max_entries must be at least 1".to_string(),
            ));
        }
        if self.breaker.failure_threshold == 0 {
            return Err(GemgateError::Configuration(
                "breaker.failure_threshold must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cache.similarity_threshold) {
            return Err(GemgateError::Configuration(format!(
                "cache.similarity_threshold must be within 0.0..=1.0, got {}",
                self.cache.similarity_threshold
            )));
        }
        Ok(())
    }

    /// Build the client.
    pub fn build(self) -> Result<GemgateClient> {
        self.validate()?;

        let provider = match self.provider {
            Some(provider) => provider,
            None => {
                let http = reqwest::Client::builder()
                    .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                    .build()
                    .map_err(|e| GemgateError::Http(e.to_string()))?;
                let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
                Arc::new(
                    GeminiProvider::with_http_client(self.api_key, base_url, http)
                        .safety_threshold(self.safety_threshold),
                )
            }
        };

        Ok(GemgateClient::new(
            provider,
            self.retry,
            ResponseCache::new(&self.cache),
            RateGovernor::new(self.rate_limit),
            OfflineBreaker::new(self.breaker),
            RequestQueue::new(self.queue),
        ))
    }
}

impl Default for GemgateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
