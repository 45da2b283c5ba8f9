//! Gemgate error types

use std::time::Duration;

/// Gemgate error types
#[derive(Debug, thiserror::Error)]
pub enum GemgateError {
    // Credential errors
    #[error("no API key configured")]
    MissingCredential,

    #[error("API key rejected by the service")]
    InvalidCredential,

    // Upstream errors
    #[error("model not available: {0}")]
    ModelUnavailable(String),

    #[error("rate limited, retry in {wait:?}")]
    RateLimited { wait: Duration },

    #[error("service overloaded")]
    ServiceOverloaded,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("content filtered: {reason}")]
    ContentFiltered { reason: String },

    #[error("API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Local errors
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("request queue is shut down")]
    QueueShutdown,
}

impl GemgateError {
    /// Whether the error may clear up on its own and is worth retrying.
    ///
    /// Only an overloaded service qualifies; rate limits are surfaced to the
    /// caller with a wait time instead of being retried blindly.
    pub fn is_transient(&self) -> bool {
        matches!(self, GemgateError::ServiceOverloaded)
    }

    /// Suggested wait before trying again, when the error carries one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GemgateError::RateLimited { wait } => Some(*wait),
            _ => None,
        }
    }

    /// Human-readable message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self {
            GemgateError::MissingCredential => {
                "AI features need an API key. Add one in settings to continue.".to_string()
            }
            GemgateError::InvalidCredential => {
                "The configured API key was rejected. Check that it is correct.".to_string()
            }
            GemgateError::ModelUnavailable(model) => {
                format!("The AI model '{model}' is not available right now.")
            }
            GemgateError::RateLimited { wait } => {
                let secs = wait.as_secs_f64().ceil() as u64;
                format!("Too many AI requests. Please wait {secs} seconds and try again.")
            }
            GemgateError::ServiceOverloaded => {
                "The AI service is overloaded. Please wait 10-15 seconds and try again."
                    .to_string()
            }
            GemgateError::ContentFiltered { .. } => {
                "The AI declined to answer this request.".to_string()
            }
            GemgateError::Upstream { message, .. } => format!("AI service error: {message}"),
            other => format!("AI request failed: {other}"),
        }
    }
}

/// Result type alias for Gemgate operations
pub type Result<T> = std::result::Result<T, GemgateError>;
