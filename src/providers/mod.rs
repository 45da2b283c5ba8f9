//! Generation backends and the decorators applied around them.

pub mod gemini;
pub mod retry;
pub mod traits;

pub use gemini::{GeminiProvider, SafetyThreshold};
pub use retry::{RetryConfig, RetryingProvider};
pub use traits::GenerateProvider;
