//! The governed client facade.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, CacheStats, ResponseCache};
use crate::governance::{
    BreakerSnapshot, OfflineBreaker, RateGovernor, RateSnapshot, RequestQueue,
};
use crate::offline::OfflineResponder;
use crate::providers::{GenerateProvider, RetryConfig, RetryingProvider};
use crate::telemetry;
use crate::types::{
    AiResponse, GenerateOptions, GenerateRequest, GenerationResponse, ImageInput, LiveResponse,
    ResponseOrigin, Usage,
};
use crate::{AiGateway, GemgateError, Result};

/// Point-in-time view of every governance component, for status banners.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayStatus {
    pub has_credential: bool,
    pub breaker: BreakerSnapshot,
    pub rate: RateSnapshot,
    pub cache: CacheStats,
    pub cache_entries: usize,
    pub queue_pending: usize,
    pub queue_in_flight: usize,
}

/// Client composing cache, rate governor, offline breaker and request queue
/// around a [`GenerateProvider`].
///
/// Each client owns its own components; two clients never share state.
pub struct GemgateClient {
    provider: RetryingProvider,
    cache: ResponseCache,
    governor: RateGovernor,
    breaker: OfflineBreaker,
    queue: RequestQueue,
    offline: OfflineResponder,
}

impl GemgateClient {
    pub(crate) fn new(
        provider: Arc<dyn GenerateProvider>,
        retry: RetryConfig,
        cache: ResponseCache,
        governor: RateGovernor,
        breaker: OfflineBreaker,
        queue: RequestQueue,
    ) -> Self {
        Self {
            provider: RetryingProvider::new(provider, retry),
            cache,
            governor,
            breaker,
            queue,
            offline: OfflineResponder::new(),
        }
    }

    /// Generate text from a prompt.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<AiResponse> {
        self.generate(GenerateRequest::text(prompt, options.clone())).await
    }

    /// Generate text from a prompt plus an inline image.
    pub async fn generate_text_from_image(
        &self,
        prompt: &str,
        image: ImageInput,
        options: &GenerateOptions,
    ) -> Result<AiResponse> {
        self.generate(GenerateRequest::with_image(prompt, image, options.clone()))
            .await
    }

    /// Run a request through the full governance path.
    ///
    /// Order of checks: offline mode, credential, exact cache, similar cache
    /// (text only), rate governor, then the queued network call with retry.
    /// Synthetic answers never touch the cache, governor or queue.
    #[instrument(skip_all, fields(operation = request.operation(), model = %request.options.model))]
    pub async fn generate(&self, request: GenerateRequest) -> Result<AiResponse> {
        let operation = request.operation();

        if self.breaker.should_use_offline_mode() {
            let synthetic = self.offline.respond(&request);
            debug!(template = synthetic.template.as_str(), "serving offline response");
            metrics::counter!(telemetry::OFFLINE_RESPONSES_TOTAL,
                "template" => synthetic.template.as_str(),
            )
            .increment(1);
            return Ok(AiResponse::Synthetic(synthetic));
        }

        if !self.provider.has_credential() {
            return Err(GemgateError::MissingCredential);
        }

        let key = CacheKey::for_request(&request, self.cache.config().prefix_len);
        if let Some(response) = self.cache.get(&key) {
            return Ok(Self::live(operation, response, ResponseOrigin::Cache));
        }

        if !request.has_image() && self.cache.config().fuzzy_matching {
            let model = request.options.model.as_str();
            let similar = self.cache.find_similar_where(
                &request.prompt,
                self.cache.config().similarity_threshold,
                |candidate| !candidate.has_image() && candidate.model() == model,
            );
            if let Some(response) = similar {
                return Ok(Self::live(operation, response, ResponseOrigin::SimilarCache));
            }
        }

        let decision = self.governor.can_make_request();
        if !decision.allowed {
            warn!(wait_ms = decision.wait.as_millis() as u64, "rate limit reached");
            metrics::counter!(telemetry::RATE_LIMITED_TOTAL).increment(1);
            self.breaker.record_failure();
            return Err(GemgateError::RateLimited {
                wait: decision.wait,
            });
        }
        self.governor.record_request();

        let provider = &self.provider;
        let req = &request;
        let result = self
            .queue
            .enqueue(|| async move {
                let start = Instant::now();
                let result = provider.generate(req).await;
                Self::record_upstream(operation, start, result.is_ok());
                result
            })
            .await;

        match result {
            Ok(response) => {
                self.breaker.record_success();
                if let Some(usage) = &response.usage {
                    Self::record_token_usage(usage);
                }
                let ttl = if request.has_image() {
                    self.cache.config().image_ttl
                } else {
                    self.cache.config().ttl
                };
                self.cache.insert_with_ttl(&key, response.clone(), ttl);
                Ok(Self::live(operation, response, ResponseOrigin::Network))
            }
            Err(e) => {
                if self.counts_as_outage(&e) {
                    self.breaker.record_failure();
                }
                warn!(error = %e, "generation failed");
                Err(e)
            }
        }
    }

    /// Whether a network-path error should move the breaker toward offline.
    fn counts_as_outage(&self, error: &GemgateError) -> bool {
        self.breaker.config().trip_on_upstream_errors
            && !matches!(
                error,
                GemgateError::QueueShutdown | GemgateError::ContentFiltered { .. }
            )
    }

    fn live(
        operation: &'static str,
        response: GenerationResponse,
        origin: ResponseOrigin,
    ) -> AiResponse {
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => operation,
            "origin" => origin.label(),
        )
        .increment(1);
        AiResponse::Live(LiveResponse { response, origin })
    }

    fn record_upstream(operation: &'static str, start: Instant, ok: bool) {
        let status = if ok { "ok" } else { "error" };
        metrics::counter!(telemetry::UPSTREAM_CALLS_TOTAL,
            "operation" => operation,
            "status" => status,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => operation)
            .record(start.elapsed().as_secs_f64());
    }

    fn record_token_usage(usage: &Usage) {
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "prompt")
            .increment(u64::from(usage.prompt_tokens));
        metrics::counter!(telemetry::TOKENS_TOTAL, "direction" => "completion")
            .increment(u64::from(usage.completion_tokens));
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            has_credential: self.provider.has_credential(),
            breaker: self.breaker.snapshot(),
            rate: self.governor.snapshot(),
            cache: self.cache.stats(),
            cache_entries: self.cache.len(),
            queue_pending: self.queue.pending(),
            queue_in_flight: self.queue.in_flight(),
        }
    }

    /// Fail all callers still waiting for a queue slot and refuse new work.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }

    pub fn provider(&self) -> &Arc<dyn GenerateProvider> {
        self.provider.inner()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        self.provider.config()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    pub fn breaker(&self) -> &OfflineBreaker {
        &self.breaker
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }
}

#[async_trait]
impl AiGateway for GemgateClient {
    async fn generate_text(&self, prompt: &str, options: &GenerateOptions) -> Result<AiResponse> {
        GemgateClient::generate_text(self, prompt, options).await
    }

    async fn generate_text_from_image(
        &self,
        prompt: &str,
        image: ImageInput,
        options: &GenerateOptions,
    ) -> Result<AiResponse> {
        GemgateClient::generate_text_from_image(self, prompt, image, options).await
    }

    fn is_offline(&self) -> bool {
        self.breaker.should_use_offline_mode()
    }
}
