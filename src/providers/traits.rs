//! Provider trait for text generation backends.
//!
//! The facade talks to the network through a [`GenerateProvider`], so tests
//! and alternative backends can be injected via
//! [`GemgateBuilder::provider`](crate::GemgateBuilder::provider).
//! Decorators such as retry wrap a provider without changing its interface.
//!
//! # Example
//!
//! ```ignore
//! struct Canned;
//!
//! #[async_trait]
//! impl GenerateProvider for Canned {
//!     fn name(&self) -> &str { "canned" }
//!
//!     async fn generate(&self, _request: &GenerateRequest) -> Result<GenerationResponse> {
//!         Ok(GenerationResponse { text: "hi".into(), ..Default::default() })
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::Result;
use crate::types::{GenerateRequest, GenerationResponse};

/// Backend that turns a request into a model answer.
#[async_trait]
pub trait GenerateProvider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Whether a credential is configured. Checked by the facade before any
    /// cache or network work; providers that need none keep the default.
    fn has_credential(&self) -> bool {
        true
    }

    /// Perform one generation call (text, or text plus inline image).
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse>;
}

#[async_trait]
impl<P: GenerateProvider + ?Sized> GenerateProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn has_credential(&self) -> bool {
        (**self).has_credential()
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerationResponse> {
        (**self).generate(request).await
    }
}
