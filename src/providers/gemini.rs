//! Gemini generateContent API client.
//!
//! - POST `{base_url}/v1beta/models/{model}:generateContent?key={api_key}`.
//! - The prompt and an optional inline image go in a single `contents` entry
//!   whose `parts` hold the text and `inlineData` (base64).
//! - Sampling settings go in `generationConfig`, safety thresholds in
//!   `safetySettings`.
//! - Response text is the concatenation of `candidates[0].content.parts[*].text`.
//!
//! See: <https://ai.google.dev/api/generate-content>

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::GenerateProvider;
use crate::types::{FinishReason, GenerateRequest, GenerationResponse, SafetyRating, Usage};
use crate::{GemgateError, Result};

/// Default base URL for the Gemini API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default HTTP timeout for a single call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Wait reported for an upstream 429 without a `retry-after` header.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Blocking threshold applied to every harm category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyThreshold {
    BlockNone,
    BlockOnlyHigh,
    #[default]
    BlockMediumAndAbove,
    BlockLowAndAbove,
}

/// Client for the Gemini generateContent endpoint.
#[derive(Clone)]
pub struct GeminiProvider {
    api_key: Option<String>,
    http: Client,
    base_url: String,
    safety_threshold: SafetyThreshold,
}

impl GeminiProvider {
    /// Create a client against the public endpoint.
    ///
    /// A missing or empty key is accepted here and reported per call as
    /// [`GemgateError::MissingCredential`].
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| GemgateError::Http(e.to_string()))?;
        Ok(Self::with_http_client(api_key, base_url, http))
    }

    /// Create a client sharing an existing HTTP client.
    pub fn with_http_client(
        api_key: Option<String>,
        base_url: impl Into<String>,
        http: Client,
    ) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            safety_threshold: SafetyThreshold::default(),
        }
    }

    /// Set the safety threshold applied to all harm categories.
    pub fn safety_threshold(mut self, threshold: SafetyThreshold) -> Self {
        self.safety_threshold = threshold;
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    /// Build the JSON body for a request.
    pub(crate) fn build_body<'a>(&self, request: &'a GenerateRequest) -> WireRequest<'a> {
        let mut parts = vec![WirePartOut::Text {
            text: &request.prompt,
        }];
        if let Some(image) = &request.image {
            parts.push(WirePartOut::InlineData {
                inline_data: WireBlob {
                    mime_type: &image.mime_type,
                    data: BASE64.encode(&image.data),
                },
            });
        }

        let options = &request.options;
        WireRequest {
            contents: vec![WireContentOut { parts }],
            generation_config: WireGenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_output_tokens,
                top_p: options.top_p,
                top_k: options.top_k,
            },
            safety_settings: HARM_CATEGORIES
                .iter()
                .map(|&category| WireSafetySetting {
                    category,
                    threshold: self.safety_threshold,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl GenerateProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(GemgateError::MissingCredential)?;
        let model = &request.options.model;

        debug!(
            model = %model,
            image = request.has_image(),
            prompt_chars = request.prompt.chars().count(),
            "sending generateContent request"
        );

        let response = self
            .http
            .post(self.endpoint(model))
            .query(&[("key", api_key)])
            .json(&self.build_body(request))
            .send()
            .await
            // without_url: the URL carries the API key
            .map_err(|e| GemgateError::Http(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body, retry_after, model));
        }

        let body: WireResponse = response
            .json()
            .await
            .map_err(|e| GemgateError::MalformedResponse(e.without_url().to_string()))?;
        parse_response(body, model)
    }
}

/// Map a non-success status and body to an error.
pub(crate) fn classify_error(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
    model: &str,
) -> GemgateError {
    let message = serde_json::from_str::<WireErrorEnvelope>(body)
        .ok()
        .and_then(|env| env.error.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

    match status.as_u16() {
        401 => GemgateError::InvalidCredential,
        400 if message.contains("API key not valid") => GemgateError::InvalidCredential,
        404 => GemgateError::ModelUnavailable(model.to_string()),
        503 => GemgateError::ServiceOverloaded,
        429 => GemgateError::RateLimited {
            wait: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
        },
        _ if message.to_lowercase().contains("overloaded") => GemgateError::RateLimited {
            wait: retry_after.unwrap_or(DEFAULT_RATE_LIMIT_WAIT),
        },
        code => GemgateError::Upstream {
            status: code,
            message,
        },
    }
}

/// Extract the answer from a decoded response body.
pub(crate) fn parse_response(body: WireResponse, model: &str) -> Result<GenerationResponse> {
    let usage = body.usage_metadata.map(|u| Usage {
        prompt_tokens: u.prompt_token_count,
        completion_tokens: u.candidates_token_count,
        total_tokens: u.total_token_count,
    });

    let Some(candidate) = body.candidates.into_iter().next() else {
        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GemgateError::ContentFiltered { reason });
        }
        return Err(GemgateError::MalformedResponse(
            "response has no candidates".to_string(),
        ));
    };

    let finish_reason = candidate
        .finish_reason
        .as_deref()
        .map(FinishReason::from_wire)
        .unwrap_or_default();

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        if finish_reason == FinishReason::Safety {
            return Err(GemgateError::ContentFiltered {
                reason: "SAFETY".to_string(),
            });
        }
        return Err(GemgateError::MalformedResponse(
            "candidate has no text".to_string(),
        ));
    }

    Ok(GenerationResponse {
        text,
        finish_reason,
        safety_ratings: candidate
            .safety_ratings
            .into_iter()
            .map(|r| SafetyRating {
                category: r.category,
                probability: r.probability,
                blocked: r.blocked,
            })
            .collect(),
        usage,
        model: Some(body.model_version.unwrap_or_else(|| model.to_string())),
    })
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireRequest<'a> {
    contents: Vec<WireContentOut<'a>>,
    generation_config: WireGenerationConfig,
    safety_settings: Vec<WireSafetySetting>,
}

#[derive(Serialize)]
struct WireContentOut<'a> {
    parts: Vec<WirePartOut<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum WirePartOut<'a> {
    Text {
        text: &'a str,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: WireBlob<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireBlob<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
}

#[derive(Serialize)]
struct WireSafetySetting {
    category: &'static str,
    threshold: SafetyThreshold,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
    #[serde(default)]
    prompt_feedback: Option<WirePromptFeedback>,
    #[serde(default)]
    usage_metadata: Option<WireUsage>,
    #[serde(default)]
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCandidate {
    #[serde(default)]
    content: Option<WireContentIn>,
    #[serde(default)]
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<WireSafetyRating>,
}

#[derive(Deserialize)]
struct WireContentIn {
    #[serde(default)]
    parts: Vec<WirePartIn>,
}

#[derive(Deserialize)]
struct WirePartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct WireSafetyRating {
    category: String,
    probability: String,
    #[serde(default)]
    blocked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireUsage {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct WireErrorEnvelope {
    error: WireErrorBody,
}

#[derive(Deserialize)]
struct WireErrorBody {
    #[serde(default)]
    message: Option<String>,
}
