//! End-to-end tests of the client facade with an injected provider.
//!
//! Timed behavior runs on a paused tokio clock; the wiremock tests at the
//! bottom use real time with spacing and backoff disabled.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use gemgate::{
    AiGateway, AiResponse, BreakerConfig, BreakerState, CacheConfig, GemgateError, Gemgate,
    GemgateClient, GenerateOptions, GenerateProvider, GenerateRequest, GenerationResponse,
    ImageInput, QueueConfig, RateConfig, ResponseOrigin, Result, RetryConfig, TemplateKind, Usage,
};
use serde_json::json;
use tokio::time::Instant;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Mock provider
// ============================================================================

/// Answers "answer: {prompt}" unless told to fail; tracks calls and concurrency.
#[derive(Default)]
struct MockProvider {
    calls: AtomicU32,
    running: AtomicUsize,
    peak: AtomicUsize,
    failure: Mutex<Option<fn() -> GemgateError>>,
    latency: Duration,
    no_credential: bool,
}

impl MockProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_latency(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::default()
        })
    }

    fn without_credential() -> Arc<Self> {
        Arc::new(Self {
            no_credential: true,
            ..Self::default()
        })
    }

    fn fail_with(&self, failure: fn() -> GemgateError) {
        *self.failure.lock().unwrap() = Some(failure);
    }

    fn succeed(&self) {
        *self.failure.lock().unwrap() = None;
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerateProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn has_credential(&self) -> bool {
        !self.no_credential
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = *self.failure.lock().unwrap() {
            return Err(failure());
        }
        Ok(GenerationResponse {
            text: format!("answer: {}", request.prompt),
            usage: Some(Usage {
                prompt_tokens: 3,
                completion_tokens: 4,
                total_tokens: 7,
            }),
            ..Default::default()
        })
    }
}

fn client(provider: &Arc<MockProvider>) -> GemgateClient {
    Gemgate::builder()
        .provider(provider.clone())
        .build()
        .unwrap()
}

fn upstream_500() -> GemgateError {
    GemgateError::Upstream {
        status: 500,
        message: "boom".into(),
    }
}

/// Long enough for both the governor interval and the queue spacing to pass.
async fn pause_between_calls() {
    tokio::time::advance(Duration::from_secs(5)).await;
}

// ============================================================================
// Cache interaction
// ============================================================================

#[tokio::test(start_paused = true)]
async fn second_identical_call_is_served_from_cache() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    let first = client.generate_text("Describe a desk lamp", &options).await.unwrap();
    assert_eq!(first.origin(), Some(ResponseOrigin::Network));

    let second = client.generate_text("Describe a desk lamp", &options).await.unwrap();
    assert_eq!(second.origin(), Some(ResponseOrigin::Cache));
    assert_eq!(second.text(), "answer: Describe a desk lamp");
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn near_duplicate_prompt_uses_similar_entry() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    client
        .generate_text("Write a product description for wireless headphones", &options)
        .await
        .unwrap();
    let similar = client
        .generate_text("write a product description for wireless headphone", &options)
        .await
        .unwrap();

    assert_eq!(similar.origin(), Some(ResponseOrigin::SimilarCache));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn similar_lookup_ignores_other_models() {
    let provider = MockProvider::new();
    let client = client(&provider);

    client
        .generate_text("describe a ceramic lamp", &GenerateOptions::default())
        .await
        .unwrap();
    pause_between_calls().await;
    let other = client
        .generate_text("describe a ceramic lamp!", &GenerateOptions::new("gemini-1.5-pro"))
        .await
        .unwrap();

    assert_eq!(other.origin(), Some(ResponseOrigin::Network));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn image_answers_expire_sooner_than_text() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();
    let image = || ImageInput::jpeg(vec![0xff, 0xd8, 0xff]);

    client.generate_text_from_image("what is this", image(), &options).await.unwrap();
    pause_between_calls().await;
    client.generate_text("what is this", &options).await.unwrap();
    assert_eq!(provider.calls(), 2);

    // Past the 2 minute image TTL but inside the 5 minute text TTL.
    tokio::time::advance(Duration::from_secs(120)).await;
    let text = client.generate_text("what is this", &options).await.unwrap();
    assert_eq!(text.origin(), Some(ResponseOrigin::Cache));

    let image_again = client
        .generate_text_from_image("what is this", image(), &options)
        .await
        .unwrap();
    assert_eq!(image_again.origin(), Some(ResponseOrigin::Network));
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn image_requests_never_match_similar_entries() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    client.generate_text("find similar sneakers", &options).await.unwrap();
    pause_between_calls().await;
    let image = client
        .generate_text_from_image("find similar sneakers", ImageInput::png(vec![1]), &options)
        .await
        .unwrap();

    assert_eq!(image.origin(), Some(ResponseOrigin::Network));
    assert_eq!(provider.calls(), 2);
}

// ============================================================================
// Credential and rate governance
// ============================================================================

#[tokio::test(start_paused = true)]
async fn missing_credential_fails_before_any_work() {
    let provider = MockProvider::without_credential();
    let client = client(&provider);

    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GemgateError::MissingCredential));
    assert_eq!(provider.calls(), 0);
    assert_eq!(client.governor().snapshot().requests_in_window, 0);
    assert_eq!(client.breaker().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn governor_denial_is_rate_limited_and_counts_as_failure() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    client.generate_text("first prompt", &options).await.unwrap();
    tokio::time::advance(Duration::from_secs(1)).await;

    let err = client.generate_text("an unrelated question", &options).await.unwrap_err();
    assert!(matches!(err, GemgateError::RateLimited { wait } if wait == Duration::from_secs(3)));
    assert_eq!(provider.calls(), 1);
    assert_eq!(client.breaker().consecutive_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn cache_hits_bypass_the_governor() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    client.generate_text("same prompt", &options).await.unwrap();
    for _ in 0..5 {
        assert!(client.generate_text("same prompt", &options).await.is_ok());
    }
    assert_eq!(client.governor().snapshot().requests_in_window, 1);
}

// ============================================================================
// Offline breaker
// ============================================================================

#[tokio::test(start_paused = true)]
async fn three_failures_then_synthetic_answer_without_network() {
    let provider = MockProvider::new();
    provider.fail_with(upstream_500);
    let client = client(&provider);
    let options = GenerateOptions::default();

    for i in 0..3 {
        let err = client
            .generate_text(&format!("question number {i}"), &options)
            .await
            .unwrap_err();
        assert!(matches!(err, GemgateError::Upstream { status: 500, .. }));
        pause_between_calls().await;
    }
    assert_eq!(client.breaker().state(), BreakerState::Offline);

    let answer = client
        .generate_text("Generate tags for a yoga mat", &options)
        .await
        .unwrap();
    match answer {
        AiResponse::Synthetic(synthetic) => {
            assert_eq!(synthetic.template, TemplateKind::ProductTags);
            assert_eq!(synthetic.category.as_deref(), Some("sports"));
        }
        other => panic!("expected synthetic answer, got {other:?}"),
    }
    assert_eq!(provider.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn offline_answers_leave_cache_and_governor_untouched() {
    let provider = MockProvider::new();
    let client = client(&provider);
    client.breaker().force_offline();

    let answer = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap();
    assert!(answer.is_offline());
    assert!(client.is_offline());

    let status = client.status();
    assert_eq!(status.rate.requests_in_window, 0);
    assert_eq!(status.cache.misses, 0);
    assert_eq!(status.cache_entries, 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn service_returns_after_cooldown() {
    let provider = MockProvider::new();
    provider.fail_with(upstream_500);
    let client = client(&provider);
    let options = GenerateOptions::default();

    for i in 0..3 {
        let _ = client.generate_text(&format!("q{i}"), &options).await;
        pause_between_calls().await;
    }
    assert!(client.generate_text("next", &options).await.unwrap().is_offline());

    provider.succeed();
    tokio::time::advance(Duration::from_secs(300)).await;

    let answer = client.generate_text("next", &options).await.unwrap();
    assert_eq!(answer.origin(), Some(ResponseOrigin::Network));
    assert_eq!(client.breaker().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn success_resets_failure_count() {
    let provider = MockProvider::new();
    let client = client(&provider);
    let options = GenerateOptions::default();

    provider.fail_with(upstream_500);
    for i in 0..2 {
        let _ = client.generate_text(&format!("fail {i}"), &options).await;
        pause_between_calls().await;
    }
    assert_eq!(client.breaker().consecutive_failures(), 2);

    provider.succeed();
    client.generate_text("works now", &options).await.unwrap();
    assert_eq!(client.breaker().consecutive_failures(), 0);
}

#[tokio::test(start_paused = true)]
async fn upstream_errors_can_be_excluded_from_breaker() {
    let provider = MockProvider::new();
    provider.fail_with(upstream_500);
    let client = Gemgate::builder()
        .provider(provider.clone())
        .breaker(BreakerConfig::new().trip_on_upstream_errors(false))
        .build()
        .unwrap();

    for i in 0..5 {
        let _ = client
            .generate_text(&format!("q{i}"), &GenerateOptions::default())
            .await;
        pause_between_calls().await;
    }
    assert_eq!(client.breaker().state(), BreakerState::Online);
    assert_eq!(provider.calls(), 5);
}

// ============================================================================
// Retry and queue through the facade
// ============================================================================

#[tokio::test(start_paused = true)]
async fn overloaded_is_retried_once_with_backoff() {
    let provider = MockProvider::new();
    provider.fail_with(|| GemgateError::ServiceOverloaded);
    let client = client(&provider);

    let start = Instant::now();
    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GemgateError::ServiceOverloaded));
    assert_eq!(provider.calls(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(client.breaker().consecutive_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn configured_retry_policy_wraps_the_provider() {
    let provider = MockProvider::new();
    provider.fail_with(|| GemgateError::ServiceOverloaded);
    let client = Gemgate::builder()
        .provider(provider.clone())
        .retry(RetryConfig::disabled())
        .build()
        .unwrap();
    assert_eq!(client.retry_config().max_attempts, 1);

    let start = Instant::now();
    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, GemgateError::ServiceOverloaded));
    assert_eq!(provider.calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn burst_of_twenty_runs_every_call_within_concurrency_bound() {
    let provider = MockProvider::with_latency(Duration::from_millis(200));
    let client = Arc::new(
        Gemgate::builder()
            .provider(provider.clone())
            .rate_limit(
                RateConfig::new()
                    .max_requests_per_minute(100)
                    .min_request_interval(Duration::ZERO),
            )
            .queue(QueueConfig::default())
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move {
                let options = GenerateOptions::new(format!("model-{i}"));
                client
                    .generate_text(&format!("distinct request #{i:02}"), &options)
                    .await
            })
        })
        .collect();

    for handle in handles {
        let answer = handle.await.unwrap().unwrap();
        assert_eq!(answer.origin(), Some(ResponseOrigin::Network));
    }
    assert_eq!(provider.calls(), 20);
    assert!(provider.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn shutdown_rejects_new_network_calls() {
    let provider = MockProvider::new();
    let client = client(&provider);
    client.shutdown();

    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GemgateError::QueueShutdown));
    assert_eq!(provider.calls(), 0);
    assert_eq!(client.breaker().consecutive_failures(), 0);
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn builder_rejects_invalid_settings() {
    let zero_concurrency = Gemgate::builder()
        .queue(QueueConfig::new().max_concurrent_requests(0))
        .build();
    assert!(matches!(zero_concurrency, Err(GemgateError::Configuration(_))));

    let bad_threshold = Gemgate::builder()
        .cache(CacheConfig::new().similarity_threshold(1.5))
        .build();
    assert!(matches!(bad_threshold, Err(GemgateError::Configuration(_))));

    let zero_failures = Gemgate::builder()
        .breaker(BreakerConfig::new().failure_threshold(0))
        .build();
    assert!(matches!(zero_failures, Err(GemgateError::Configuration(_))));

    let zero_capacity = Gemgate::builder()
        .cache(CacheConfig::new().max_entries(0))
        .build();
    assert!(matches!(zero_capacity, Err(GemgateError::Configuration(_))));
}

#[tokio::test]
async fn builder_without_key_reports_missing_credential() {
    let client = Gemgate::builder().build().unwrap();
    assert!(!client.status().has_credential);

    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GemgateError::MissingCredential));
}

#[tokio::test(start_paused = true)]
async fn gateway_trait_object_dispatch() {
    let provider = MockProvider::new();
    let gateway: Arc<dyn AiGateway> = Arc::new(client(&provider));

    let answer = gateway
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.text(), "answer: hello");
    assert!(!gateway.is_offline());
}

// ============================================================================
// Against a mock Gemini endpoint
// ============================================================================

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": text }] },
            "finishReason": "STOP"
        }]
    })
}

fn wiremock_client(server: &MockServer) -> GemgateClient {
    Gemgate::builder()
        .api_key("test-key")
        .base_url(server.uri())
        .queue(QueueConfig::new().request_spacing(Duration::ZERO))
        .rate_limit(RateConfig::new().min_request_interval(Duration::ZERO))
        .retry(RetryConfig::new().backoff(Duration::ZERO))
        .build()
        .unwrap()
}

#[tokio::test]
async fn cached_answer_makes_no_second_http_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply("A sturdy lamp.")))
        .expect(1)
        .mount(&server)
        .await;

    let client = wiremock_client(&server);
    let options = GenerateOptions::default();

    let first = client.generate_text("Describe a lamp", &options).await.unwrap();
    let second = client.generate_text("Describe a lamp", &options).await.unwrap();

    assert_eq!(first.text(), "A sturdy lamp.");
    assert_eq!(second.origin(), Some(ResponseOrigin::Cache));
}

#[tokio::test]
async fn repeated_http_failures_switch_to_offline_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("down"))
        .expect(3)
        .mount(&server)
        .await;

    let client = wiremock_client(&server);
    let options = GenerateOptions::default();

    for i in 0..3 {
        assert!(client.generate_text(&format!("prompt {i}"), &options).await.is_err());
    }
    let fourth = client.generate_text("prompt 3", &options).await.unwrap();
    assert!(fourth.is_offline());
}

#[tokio::test]
async fn http_503_is_retried_then_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let client = wiremock_client(&server);
    let err = client
        .generate_text("hello", &GenerateOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GemgateError::ServiceOverloaded));
    assert!(err.user_message().contains("10-15 seconds"));
}
