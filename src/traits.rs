//! Core AiGateway trait

use async_trait::async_trait;

use crate::Result;
use crate::types::{AiResponse, GenerateOptions, ImageInput};

/// The abstraction UI layers depend on.
///
/// Implementations decide for themselves whether an answer is live or
/// synthetic; callers only see the tagged [`AiResponse`].
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Generate text from a prompt.
    async fn generate_text(&self, prompt: &str, options: &GenerateOptions) -> Result<AiResponse>;

    /// Generate text from a prompt plus an inline image.
    async fn generate_text_from_image(
        &self,
        prompt: &str,
        image: ImageInput,
        options: &GenerateOptions,
    ) -> Result<AiResponse>;

    /// Whether answers are currently being synthesized locally.
    fn is_offline(&self) -> bool {
        false
    }
}
