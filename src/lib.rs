//! Gemgate - request governance for the Gemini generative-AI API
//!
//! This crate sits between an application and the Gemini `generateContent`
//! endpoint and decides, per call, whether to answer from a response cache,
//! refuse because of the client-side rate budget, serve a locally synthesized
//! answer while the service is considered offline, or queue a real network
//! call.
//!
//! # Example
//!
//! ```rust,no_run
//! use gemgate::{Gemgate, GenerateOptions};
//!
//! #[tokio::main]
//! async fn main() -> gemgate::Result<()> {
//!     let client = Gemgate::builder()
//!         .api_key("your-gemini-key")
//!         .build()?;
//!
//!     let answer = client
//!         .generate_text(
//!             "Write a short description for a ceramic table lamp",
//!             &GenerateOptions::default(),
//!         )
//!         .await?;
//!
//!     if answer.is_offline() {
//!         println!("(offline) {}", answer.text());
//!     } else {
//!         println!("{}", answer.text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod governance;
pub mod offline;
pub mod providers;
pub mod telemetry;
pub mod traits;
pub mod types;

// Re-export main types at crate root
pub use error::{GemgateError, Result};
pub use gateway::{GatewayStatus, Gemgate, GemgateBuilder, GemgateClient};
pub use traits::AiGateway;

pub use cache::{CacheConfig, CacheKey, CacheStats, ResponseCache};
pub use config::{Config, Secrets};
pub use governance::{
    BreakerConfig, BreakerSnapshot, BreakerState, OfflineBreaker, QueueConfig, RateConfig,
    RateDecision, RateGovernor, RateSnapshot, RequestQueue,
};
pub use offline::OfflineResponder;
pub use providers::{
    GeminiProvider, GenerateProvider, RetryConfig, RetryingProvider, SafetyThreshold,
};

// Re-export all types
pub use types::{
    AiResponse, DEFAULT_MODEL, FinishReason, GenerateOptions, GenerateRequest,
    GenerationResponse, ImageInput, LiveResponse, ResponseOrigin, SafetyRating,
    SyntheticResponse, TemplateKind, Usage,
};
