//! Request fingerprints.

use std::fmt;

use crate::types::GenerateRequest;

/// Fingerprint of a generation request.
///
/// Built from a prefix of the prompt, whether an image is attached, the
/// sampling temperature and the model. Two prompts that share the first
/// `prefix_len` characters and the same settings map to the same key; this
/// is an accepted approximation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    key: String,
    fragment: String,
    has_image: bool,
    model: String,
}

impl CacheKey {
    /// Derive the key for a request.
    pub fn for_request(request: &GenerateRequest, prefix_len: usize) -> Self {
        let fragment = prompt_prefix(&request.prompt, prefix_len);
        let has_image = request.has_image();
        let temperature = request
            .options
            .temperature
            .map(|t| format!("{t:.2}"))
            .unwrap_or_else(|| "default".to_string());
        let model = request.options.model.clone();
        let key = format!("{fragment}|image={has_image}|temp={temperature}|model={model}");
        Self {
            key,
            fragment,
            has_image,
            model,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// The prompt prefix this key was built from; compared by fuzzy lookup.
    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn has_image(&self) -> bool {
        self.has_image
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// First `len` characters of `prompt` (char-boundary safe).
pub(crate) fn prompt_prefix(prompt: &str, len: usize) -> String {
    prompt.chars().take(len).collect()
}
