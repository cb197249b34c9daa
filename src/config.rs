use std::time::Duration;

use crate::error::{Result, StudioError};
use crate::types::PhotoStyle;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "API_KEY";

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GENERATION_MODEL: &str = "imagen-4.0-generate-001";
pub const DEFAULT_EDIT_MODEL: &str = "gemini-2.5-flash-image";

/// Configuration for [`GeminiClient`](crate::client::GeminiClient).
///
/// Use [`GeminiConfig::from_env()`] in applications, or
/// [`GeminiConfig::builder()`] to set every field explicitly.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`.
    pub api_key: String,

    /// Base URL of the Generative Language API.
    pub endpoint: String,

    /// Text-to-image model used for batch generation.
    pub generation_model: String,

    /// Multimodal model used for prompt-driven edits.
    pub edit_model: String,

    /// MIME type requested for generated images.
    pub output_mime_type: String,

    /// Aspect ratio requested for generated images.
    pub aspect_ratio: String,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            edit_model: DEFAULT_EDIT_MODEL.to_string(),
            output_mime_type: "image/jpeg".to_string(),
            aspect_ratio: "1:1".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl GeminiConfig {
    /// Start building a config with the builder pattern.
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder::default()
    }

    /// Default configuration with the API key read from `API_KEY`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).unwrap_or_default();
        Self::builder().with_api_key(api_key).build()
    }
}

/// Builder for [`GeminiConfig`].
#[derive(Default)]
pub struct GeminiConfigBuilder {
    config: GeminiConfig,
}

impl GeminiConfigBuilder {
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    /// Point the client at another base URL (proxies, local mocks).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_generation_model(mut self, model: impl Into<String>) -> Self {
        self.config.generation_model = model.into();
        self
    }

    pub fn with_edit_model(mut self, model: impl Into<String>) -> Self {
        self.config.edit_model = model.into();
        self
    }

    pub fn with_output_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.config.output_mime_type = mime.into();
        self
    }

    pub fn with_aspect_ratio(mut self, ratio: impl Into<String>) -> Self {
        self.config.aspect_ratio = ratio.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Build the final [`GeminiConfig`]. Fails if no API key was provided.
    pub fn build(self) -> Result<GeminiConfig> {
        if self.config.api_key.trim().is_empty() {
            return Err(StudioError::MissingApiKey(API_KEY_ENV.to_string()));
        }
        Ok(self.config)
    }
}

/// Configuration for a [`Studio`](crate::studio::Studio) session.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// Style selected until the user picks another one.
    pub default_style: PhotoStyle,

    /// Capacity of the broadcast channel behind [`Session::subscribe`](crate::session::Session::subscribe).
    pub event_capacity: usize,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            default_style: PhotoStyle::BrightModern,
            event_capacity: 256,
        }
    }
}

impl StudioConfig {
    pub fn builder() -> StudioConfigBuilder {
        StudioConfigBuilder::default()
    }
}

/// Builder for [`StudioConfig`].
#[derive(Default)]
pub struct StudioConfigBuilder {
    config: StudioConfig,
}

impl StudioConfigBuilder {
    pub fn with_default_style(mut self, style: PhotoStyle) -> Self {
        self.config.default_style = style;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> StudioConfig {
        self.config
    }
}
