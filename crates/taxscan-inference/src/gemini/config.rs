//! Gemini client configuration.

use std::time::Duration;

use derive_builder::Builder;
use reqwest::Url;

/// Public Gemini API host.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Model used for receipt extraction.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

/// Default per-request timeout: 60 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for the Gemini client.
#[derive(Clone, Builder)]
#[builder(
    name = "GeminiBuilder",
    pattern = "owned",
    setter(into, prefix = "with"),
    build_fn(validate = "Self::validate_config")
)]
pub struct GeminiConfig {
    /// API key sent in the `x-goog-api-key` header.
    pub api_key: String,
    /// Base URL of the Gemini API.
    #[builder(default = "DEFAULT_BASE_URL.to_owned()")]
    pub base_url: String,
    /// Model name, without the `models/` prefix.
    #[builder(default = "DEFAULT_MODEL.to_owned()")]
    pub model: String,
    /// Timeout for each `generateContent` call.
    #[builder(default = "Duration::from_secs(DEFAULT_TIMEOUT_SECS)")]
    pub timeout: Duration,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl GeminiConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GeminiBuilder {
        GeminiBuilder::default()
    }

    /// Returns the URL of the model's `generateContent` method.
    pub fn generate_content_url(&self) -> crate::Result<Url> {
        self.model_endpoint(":generateContent")
    }

    /// Returns the URL describing the configured model.
    pub fn model_url(&self) -> crate::Result<Url> {
        self.model_endpoint("")
    }

    fn model_endpoint(&self, method: &str) -> crate::Result<Url> {
        let endpoint = format!(
            "{}/v1beta/models/{}{method}",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        Url::parse(&endpoint).map_err(|e| {
            crate::Error::configuration()
                .with_message(format!("invalid Gemini endpoint '{endpoint}': {e}"))
        })
    }
}

impl GeminiBuilder {
    fn validate_config(&self) -> std::result::Result<(), String> {
        if let Some(api_key) = &self.api_key
            && api_key.trim().is_empty()
        {
            return Err("API key must not be empty".to_owned());
        }

        if let Some(model) = &self.model
            && model.trim().is_empty()
        {
            return Err("Model must not be empty".to_owned());
        }

        if let Some(timeout) = &self.timeout
            && timeout.is_zero()
        {
            return Err("Timeout must be greater than 0".to_owned());
        }

        if let Some(base_url) = &self.base_url
            && Url::parse(base_url).is_err()
        {
            return Err(format!("Invalid base URL '{base_url}'"));
        }

        Ok(())
    }
}
