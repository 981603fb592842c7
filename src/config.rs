//! Loader configuration
//!
//! Values come from the environment first and are then overridden by CLI flags.

use crate::loader::config::{DEFAULT_MAX_CONCURRENCY, DEFAULT_REQUEST_TIMEOUT, MAX_CONCURRENCY};
use std::path::PathBuf;
use std::time::Duration;

/// Default statistics API host
pub const DEFAULT_BASE_URL: &str = "https://statistics-api.wildberries.ru";

/// Default directory for output documents
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "WB_API_KEY";

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "WB_API_URL";

/// Environment variable overriding the output directory
pub const OUTPUT_DIR_ENV: &str = "WB_OUTPUT_DIR";

/// Opaque API token sent as a bearer credential.
///
/// The only validation is non-emptiness. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    /// Wrap a token, rejecting empty or whitespace-only values
    pub fn new(token: impl Into<String>) -> Result<Self, ConfigError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(token))
    }

    /// Read the token from `WB_API_KEY`
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey)?;
        Self::new(token)
    }

    /// Raw token value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiToken(****)")
    }
}

/// Runtime settings for a load
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// API base URL substituted into endpoint templates
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Maximum number of reports fetched at once
    pub max_concurrency: usize,
    /// Minimum spacing between request starts
    pub request_delay: Duration,
    /// Retries performed by the HTTP client on transient failures
    pub max_retries: u32,
    /// Directory for output documents
    pub output_dir: PathBuf,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            request_delay: Duration::ZERO,
            max_retries: 0,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

impl LoaderConfig {
    /// Defaults overlaid with `WB_API_URL` and `WB_OUTPUT_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(url) = non_empty_env(API_URL_ENV) {
            config.base_url = url;
        }
        if let Some(dir) = non_empty_env(OUTPUT_DIR_ENV) {
            config.output_dir = PathBuf::from(dir);
        }

        config
    }

    /// Check value ranges and the base URL scheme
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if self.max_concurrency == 0 || self.max_concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::Invalid(format!(
                "max concurrency must be between 1 and {MAX_CONCURRENCY}"
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid("request timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No usable API key
    #[error("API key is missing: set {API_KEY_ENV}")]
    MissingApiKey,

    /// A value is outside its allowed range
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
