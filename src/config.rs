//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (e.g. the CLI's `--config <path>`)
//! 2. `~/.gemgate/config.toml` (user)
//! 3. `/etc/gemgate/config.toml` (system)
//!
//! When none of these exist the built-in defaults apply. Every section and
//! every field is optional.
//!
//! The API key is loaded separately with a mandatory permission check:
//! 1. `~/.gemgate/secrets.toml` (user, must be 0600 or 0400)
//! 2. `/etc/gemgate/secrets.toml` (system, same rule)
//! 3. `GEMINI_API_KEY` environment variable

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::governance::{BreakerConfig, QueueConfig, RateConfig};
use crate::providers::gemini::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::providers::{RetryConfig, SafetyThreshold};
use crate::types::{DEFAULT_MODEL, GenerateOptions};
use crate::{GemgateError, Result};

/// Environment variable consulted when no secrets file holds a key.
pub const API_KEY_ENV_VAR: &str = "GEMINI_API_KEY";

const CONFIG_DIR: &str = ".gemgate";
const SYSTEM_DIR: &str = "/etc/gemgate";

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiSection,
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub breaker: BreakerSection,
    #[serde(default)]
    pub queue: QueueSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// Transport settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeminiSection {
    pub base_url: String,
    pub timeout_secs: u64,
    pub safety_threshold: SafetyThreshold,
}

impl Default for GeminiSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            safety_threshold: SafetyThreshold::default(),
        }
    }
}

/// Default generation options, used by the CLI.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationSection {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub top_p: Option<f32>,
    pub top_k: Option<u32>,
}

impl Default for GenerationSection {
    fn default() -> Self {
        let defaults = GenerateOptions::default();
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: defaults.temperature,
            max_output_tokens: defaults.max_output_tokens,
            top_p: defaults.top_p,
            top_k: defaults.top_k,
        }
    }
}

impl GenerationSection {
    pub fn options(&self) -> GenerateOptions {
        GenerateOptions {
            model: self.model.clone(),
            temperature: self.temperature,
            max_output_tokens: self.max_output_tokens,
            top_p: self.top_p,
            top_k: self.top_k,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub max_entries: usize,
    pub evict_count: usize,
    pub ttl_secs: u64,
    pub image_ttl_secs: u64,
    pub prefix_len: usize,
    pub similarity_threshold: f64,
    pub fuzzy_matching: bool,
}

impl Default for CacheSection {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_entries: defaults.max_entries,
            evict_count: defaults.evict_count,
            ttl_secs: defaults.ttl.as_secs(),
            image_ttl_secs: defaults.image_ttl.as_secs(),
            prefix_len: defaults.prefix_len,
            similarity_threshold: defaults.similarity_threshold,
            fuzzy_matching: defaults.fuzzy_matching,
        }
    }
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        CacheConfig::new()
            .max_entries(section.max_entries)
            .evict_count(section.evict_count)
            .ttl(Duration::from_secs(section.ttl_secs))
            .image_ttl(Duration::from_secs(section.image_ttl_secs))
            .prefix_len(section.prefix_len)
            .similarity_threshold(section.similarity_threshold)
            .fuzzy_matching(section.fuzzy_matching)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_requests_per_minute: usize,
    pub min_request_interval_ms: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = RateConfig::default();
        Self {
            max_requests_per_minute: defaults.max_requests_per_minute,
            min_request_interval_ms: defaults.min_request_interval.as_millis() as u64,
        }
    }
}

impl From<&RateLimitSection> for RateConfig {
    fn from(section: &RateLimitSection) -> Self {
        RateConfig::new()
            .max_requests_per_minute(section.max_requests_per_minute)
            .min_request_interval(Duration::from_millis(section.min_request_interval_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakerSection {
    pub failure_threshold: u32,
    pub cooldown_secs: u64,
    pub trip_on_upstream_errors: bool,
}

impl Default for BreakerSection {
    fn default() -> Self {
        let defaults = BreakerConfig::default();
        Self {
            failure_threshold: defaults.failure_threshold,
            cooldown_secs: defaults.cooldown.as_secs(),
            trip_on_upstream_errors: defaults.trip_on_upstream_errors,
        }
    }
}

impl From<&BreakerSection> for BreakerConfig {
    fn from(section: &BreakerSection) -> Self {
        BreakerConfig::new()
            .failure_threshold(section.failure_threshold)
            .cooldown(Duration::from_secs(section.cooldown_secs))
            .trip_on_upstream_errors(section.trip_on_upstream_errors)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub max_concurrent_requests: usize,
    pub request_spacing_ms: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        let defaults = QueueConfig::default();
        Self {
            max_concurrent_requests: defaults.max_concurrent_requests,
            request_spacing_ms: defaults.request_spacing.as_millis() as u64,
        }
    }
}

impl From<&QueueSection> for QueueConfig {
    fn from(section: &QueueSection) -> Self {
        QueueConfig::new()
            .max_concurrent_requests(section.max_concurrent_requests)
            .request_spacing(Duration::from_millis(section.request_spacing_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub backoff_secs: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            backoff_secs: defaults.backoff.as_secs(),
        }
    }
}

impl From<&RetrySection> for RetryConfig {
    fn from(section: &RetrySection) -> Self {
        RetryConfig::new()
            .max_attempts(section.max_attempts)
            .backoff(Duration::from_secs(section.backoff_secs))
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// An explicit path that does not exist is an error; absent default
    /// locations fall back to [`Config::default`].
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse a specific config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            GemgateError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GemgateError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(GemgateError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(CONFIG_DIR).join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        let system_config = Path::new(SYSTEM_DIR).join("config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// Secrets file contents.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub gemini: Option<ApiKeySecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Returns empty secrets if no file exists; [`Secrets::api_key`] then
    /// falls back to the environment.
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(CONFIG_DIR).join("secrets.toml");
            if user_secrets.exists() {
                return Self::load_from_file(&user_secrets);
            }
        }

        let system_secrets = Path::new(SYSTEM_DIR).join("secrets.toml");
        if system_secrets.exists() {
            return Self::load_from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Parse a specific secrets file after checking its permissions.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            GemgateError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            GemgateError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            GemgateError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(GemgateError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// The Gemini API key, falling back to `GEMINI_API_KEY`.
    pub fn api_key(&self) -> Option<String> {
        self.gemini
            .as_ref()
            .map(|s| s.api_key.clone())
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV_VAR).ok())
    }
}
