//! Request types for text generation.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{GemgateError, Result};

/// Model used when none is specified.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Options for text generation.
///
/// Defaults match what the storefront sends for product copy:
/// moderately creative, bounded output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Model to use for generation.
    pub model: String,

    /// Sampling temperature (0.0 to 2.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,

    /// Nucleus sampling threshold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling: only consider the k most likely tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: Some(0.7),
            max_output_tokens: Some(1024),
            top_p: Some(0.8),
            top_k: Some(40),
        }
    }
}

impl GenerateOptions {
    /// Create default options for the specified model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max output tokens.
    pub fn max_output_tokens(mut self, max_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_tokens);
        self
    }

    /// Set top_p.
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set top-k sampling.
    pub fn top_k(mut self, k: u32) -> Self {
        self.top_k = Some(k);
        self
    }
}

/// Inline image attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// MIME type, e.g. `image/jpeg`.
    pub mime_type: String,
    /// Raw image bytes (base64-encoded on the wire).
    pub data: Vec<u8>,
}

impl ImageInput {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn jpeg(data: Vec<u8>) -> Self {
        Self::new("image/jpeg", data)
    }

    pub fn png(data: Vec<u8>) -> Self {
        Self::new("image/png", data)
    }

    /// Read an image from disk, inferring the MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let mime_type = match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            Some("gif") => "image/gif",
            Some("heic") => "image/heic",
            other => {
                return Err(GemgateError::Configuration(format!(
                    "unsupported image type {other:?} for {path:?}"
                )));
            }
        };
        let data = std::fs::read(path).map_err(|e| {
            GemgateError::Configuration(format!("failed to read image {path:?}: {e}"))
        })?;
        Ok(Self::new(mime_type, data))
    }
}

/// A complete generation request as seen by providers.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<ImageInput>,
    pub options: GenerateOptions,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>, options: GenerateOptions) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            options,
        }
    }

    pub fn with_image(
        prompt: impl Into<String>,
        image: ImageInput,
        options: GenerateOptions,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            image: Some(image),
            options,
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Metric label for this request.
    pub(crate) fn operation(&self) -> &'static str {
        if self.has_image() { "image" } else { "text" }
    }
}
