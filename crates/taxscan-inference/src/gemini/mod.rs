//! Google Gemini recognition provider.
//!
//! Calls the `generateContent` REST endpoint with the document attached as
//! inline data, a deterministic generation config and a JSON response schema.
//!
//! # Example
//!
//! ```rust,ignore
//! use taxscan_inference::gemini::{GeminiClient, GeminiConfig};
//!
//! let config = GeminiConfig::builder()
//!     .with_api_key(std::env::var("GEMINI_API_KEY")?)
//!     .build()?;
//!
//! let extraction = GeminiClient::new(config)?.into_service();
//! let records = extraction.extract(&document).await?;
//! ```

mod args;
mod client;
mod config;
mod error;
mod wire;

pub use args::GeminiArgs;
pub use client::GeminiClient;
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, GeminiBuilder, GeminiBuilderError,
    GeminiConfig,
};
pub use error::{Error, Result};

/// Tracing target for Gemini client operations.
pub const TRACING_TARGET: &str = "taxscan_inference::gemini";
