//! Response types

use serde::{Deserialize, Serialize};

/// A response obtained from the generation service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    #[serde(default)]
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub safety_ratings: Vec<SafetyRating>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Safety classification attached to a candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyRating {
    pub category: String,
    pub probability: String,
    #[serde(default)]
    pub blocked: bool,
}

/// Reason the model stopped generating
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    MaxTokens,
    Safety,
    Recitation,
    Other(String),
}

impl FinishReason {
    /// Map the service's upper-case reason string.
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" => FinishReason::Safety,
            "RECITATION" => FinishReason::Recitation,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Where a live answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    /// Fetched from the service for this call.
    Network,
    /// Exact fingerprint hit in the response cache.
    Cache,
    /// Approximate prompt match in the response cache.
    SimilarCache,
}

impl ResponseOrigin {
    pub(crate) fn label(self) -> &'static str {
        match self {
            ResponseOrigin::Network => "network",
            ResponseOrigin::Cache => "cache",
            ResponseOrigin::SimilarCache => "similar",
        }
    }
}

/// A genuine model answer.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveResponse {
    pub response: GenerationResponse,
    pub origin: ResponseOrigin,
}

/// Kind of canned template used for an offline answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    ProductTags,
    ProductDescription,
    ReviewEnhancement,
    Recommendations,
    VisualSearch,
    Generic,
}

impl TemplateKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateKind::ProductTags => "product_tags",
            TemplateKind::ProductDescription => "product_description",
            TemplateKind::ReviewEnhancement => "review_enhancement",
            TemplateKind::Recommendations => "recommendations",
            TemplateKind::VisualSearch => "visual_search",
            TemplateKind::Generic => "generic",
        }
    }
}

/// A locally synthesized answer served while the service is considered offline.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticResponse {
    pub text: String,
    pub template: TemplateKind,
    /// Product category the template was derived from, if one was detected.
    pub category: Option<String>,
}

/// Answer returned by the facade.
///
/// Degraded answers are a separate variant so callers must decide how to
/// present them (e.g. an "offline" banner).
#[derive(Debug, Clone, PartialEq)]
pub enum AiResponse {
    Live(LiveResponse),
    Synthetic(SyntheticResponse),
}

impl AiResponse {
    /// The answer text, live or synthetic.
    pub fn text(&self) -> &str {
        match self {
            AiResponse::Live(live) => &live.response.text,
            AiResponse::Synthetic(synthetic) => &synthetic.text,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, AiResponse::Synthetic(_))
    }

    pub fn as_live(&self) -> Option<&LiveResponse> {
        match self {
            AiResponse::Live(live) => Some(live),
            AiResponse::Synthetic(_) => None,
        }
    }

    /// Origin of a live answer; `None` for synthetic ones.
    pub fn origin(&self) -> Option<ResponseOrigin> {
        self.as_live().map(|live| live.origin)
    }
}
