#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod service;

pub mod request;
pub mod response;
pub mod schema;

#[cfg(feature = "gemini")]
#[cfg_attr(docsrs, doc(cfg(feature = "gemini")))]
pub mod gemini;

pub use request::{DocumentPart, RecognitionRequest};
pub use response::{Extraction, RecognitionResponse, parse_records};
pub use service::ExtractionClient;
pub use taxscan_core::{Error, ErrorKind, Result, ServiceHealth, ServiceStatus};

/// Tracing target for extraction operations.
pub const TRACING_TARGET: &str = "taxscan_inference";

/// Tracing target for response decoding.
pub const TRACING_TARGET_DECODE: &str = "taxscan_inference::decode";

/// Core trait for recognition service operations.
///
/// Implement this trait to plug in a recognition backend. Providers carry no
/// internal deadline; any timeout is part of their transport configuration.
#[async_trait::async_trait]
pub trait RecognitionProvider: Send + Sync {
    /// Sends one document to the service and returns its raw text answer.
    ///
    /// Fails with a `RecognitionTransport` error when the service is
    /// unreachable, times out or answers with a non-success status.
    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse>;

    /// Performs a health check on the recognition service.
    async fn health_check(&self) -> Result<ServiceHealth>;
}
