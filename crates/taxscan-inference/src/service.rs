//! Extraction service wrapper with observability.

use std::sync::Arc;
use std::time::Instant;

use taxscan_core::Document;

use crate::{
    Extraction, RecognitionProvider, RecognitionRequest, Result, ServiceHealth, TRACING_TARGET,
    parse_records,
};

/// Extracts receipt records from single documents.
///
/// Wraps a [`RecognitionProvider`] with request construction, response
/// decoding, and structured logging. The provider is held in an `Arc`, so
/// clones are cheap and share the same backend.
#[derive(Clone)]
pub struct ExtractionClient {
    inner: Arc<dyn RecognitionProvider>,
}

impl std::fmt::Debug for ExtractionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionClient").finish_non_exhaustive()
    }
}

impl ExtractionClient {
    /// Creates a new extraction client over `provider`.
    pub fn new<P>(provider: P) -> Self
    where
        P: RecognitionProvider + 'static,
    {
        Self {
            inner: Arc::new(provider),
        }
    }

    /// Creates an extraction client from a shared provider.
    pub fn from_arc(provider: Arc<dyn RecognitionProvider>) -> Self {
        Self { inner: provider }
    }

    /// Extracts every receipt found in `document`.
    ///
    /// Fails with `UnsupportedMediaKind` before any network call for documents
    /// that are neither images nor PDFs, `RecognitionTransport` when the
    /// service cannot be reached, and `Schema` when its answer cannot be read.
    pub async fn extract(&self, document: &Document) -> Result<Extraction> {
        let request = RecognitionRequest::for_document(document)?;
        let start = Instant::now();

        tracing::debug!(
            target: TRACING_TARGET,
            document_id = %document.id(),
            document = %document.name(),
            media_type = %document.media_type(),
            size = document.len(),
            "Extracting receipts"
        );

        let result = self
            .inner
            .recognize(&request)
            .await
            .and_then(|response| parse_records(&response.text));
        let elapsed = start.elapsed();

        match &result {
            Ok(extraction) => {
                tracing::debug!(
                    target: TRACING_TARGET,
                    document_id = %document.id(),
                    records = extraction.records.len(),
                    warnings = extraction.warnings.len(),
                    elapsed_ms = elapsed.as_millis(),
                    "Extraction successful"
                );
            }
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    document_id = %document.id(),
                    error = %error,
                    elapsed_ms = elapsed.as_millis(),
                    "Extraction failed"
                );
            }
        }

        result
    }

    /// Performs a health check on the recognition provider.
    pub async fn health_check(&self) -> Result<ServiceHealth> {
        self.inner.health_check().await
    }
}
