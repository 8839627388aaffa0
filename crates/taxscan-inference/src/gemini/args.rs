//! Command-line and environment configuration for the Gemini provider.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

use super::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GeminiConfig};

/// Gemini settings as read from flags, environment or a config file.
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct GeminiArgs {
    /// API key for the Gemini API
    #[cfg_attr(
        feature = "config",
        arg(long = "gemini-api-key", env = "GEMINI_API_KEY", hide_env_values = true)
    )]
    #[serde(default)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for extraction
    #[cfg_attr(
        feature = "config",
        arg(long = "gemini-model", env = "GEMINI_MODEL", default_value = DEFAULT_MODEL)
    )]
    #[serde(default = "default_model")]
    pub gemini_model: String,

    /// Base URL of the Gemini API
    #[cfg_attr(
        feature = "config",
        arg(long = "gemini-base-url", env = "GEMINI_BASE_URL", default_value = DEFAULT_BASE_URL)
    )]
    #[serde(default = "default_base_url")]
    pub gemini_base_url: String,

    /// Timeout for each recognition request in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "gemini-timeout", env = "GEMINI_TIMEOUT", default_value = "60")
    )]
    #[serde(default = "default_timeout_secs")]
    pub gemini_timeout: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_owned()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for GeminiArgs {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: default_model(),
            gemini_base_url: default_base_url(),
            gemini_timeout: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for GeminiArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiArgs")
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "<redacted>"))
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("gemini_timeout", &self.gemini_timeout)
            .finish()
    }
}

impl GeminiArgs {
    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.gemini_api_key = Some(api_key.into());
        self
    }

    /// Set the model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.gemini_model = model.into();
        self
    }

    /// Builds the client configuration.
    ///
    /// Fails with a `Configuration` error when the API key is missing or any
    /// setting is invalid.
    pub fn to_config(&self) -> crate::Result<GeminiConfig> {
        let Some(api_key) = self.gemini_api_key.as_deref() else {
            return Err(crate::Error::configuration()
                .with_message("the recognition service API key is not set (GEMINI_API_KEY)"));
        };

        GeminiConfig::builder()
            .with_api_key(api_key)
            .with_model(self.gemini_model.as_str())
            .with_base_url(self.gemini_base_url.as_str())
            .with_timeout(Duration::from_secs(self.gemini_timeout))
            .build()
            .map_err(|e| crate::Error::configuration().with_message(e.to_string()))
    }
}
