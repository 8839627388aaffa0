//! Mock recognition provider for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use taxscan_core::{DocumentId, Error, ErrorKind, Result, ServiceHealth};
use taxscan_inference::{RecognitionProvider, RecognitionRequest, RecognitionResponse};

/// A single well-formed receipt whose subtotal equals `total - itbis`.
pub const SAMPLE_RECEIPTS: &str = r#"[{
    "rnc": "131563856",
    "ncf": "B0100055276",
    "date": "09/08/2025",
    "total": 1458.00,
    "subtotal": 1270.00,
    "itbis": 188.00,
    "isc": 0,
    "other_taxes": 0,
    "tips": 0
}]"#;

/// Configuration for the mock recognition provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct MockRecognitionConfig {
    /// Text returned for every document without an override
    #[cfg_attr(feature = "config", arg(long = "mock-response", default_value = SAMPLE_RECEIPTS))]
    pub response: String,

    /// Simulated service latency in milliseconds
    #[cfg_attr(feature = "config", arg(long = "mock-delay-ms", default_value = "0"))]
    pub delay_ms: u64,
}

impl Default for MockRecognitionConfig {
    fn default() -> Self {
        Self {
            response: SAMPLE_RECEIPTS.to_owned(),
            delay_ms: 0,
        }
    }
}

/// Call counters shared between a mock provider and the test observing it.
#[derive(Debug, Default)]
pub struct MockStats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockStats {
    /// Returns the number of recognition calls started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the number of calls currently running.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Returns the highest number of calls that ever ran at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(self: &Arc<Self>) -> InFlight {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        InFlight(self.clone())
    }
}

/// Decrements the in-flight count when a call ends or is dropped.
struct InFlight(Arc<MockStats>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted answer for one document.
#[derive(Debug, Clone)]
enum Answer {
    Text(String),
    Fail(ErrorKind),
    Panic,
    Delay(Duration, String),
}

/// Mock recognition provider for testing.
///
/// Answers with [`MockRecognitionConfig::response`] unless a per-document
/// override was registered.
#[derive(Clone, Default, Debug)]
pub struct MockRecognitionProvider {
    config: MockRecognitionConfig,
    overrides: Arc<Mutex<HashMap<DocumentId, Answer>>>,
    stats: Arc<MockStats>,
}

impl MockRecognitionProvider {
    /// Creates a new mock provider with the given configuration.
    pub fn new(config: MockRecognitionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Sets the simulated latency for every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.config.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Answers `document` with `text` instead of the default response.
    #[must_use]
    pub fn with_response_for(self, document: DocumentId, text: impl Into<String>) -> Self {
        self.script(document, Answer::Text(text.into()))
    }

    /// Fails every call for `document` with an error of `kind`.
    #[must_use]
    pub fn with_failure_for(self, document: DocumentId, kind: ErrorKind) -> Self {
        self.script(document, Answer::Fail(kind))
    }

    /// Panics inside the recognition call for `document`.
    #[must_use]
    pub fn with_panic_for(self, document: DocumentId) -> Self {
        self.script(document, Answer::Panic)
    }

    /// Answers `document` with the default response after `delay`.
    #[must_use]
    pub fn with_delay_for(self, document: DocumentId, delay: Duration) -> Self {
        let text = self.config.response.clone();
        self.script(document, Answer::Delay(delay, text))
    }

    /// Returns the call counters of this provider and its clones.
    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }

    fn script(self, document: DocumentId, answer: Answer) -> Self {
        if let Ok(mut overrides) = self.overrides.lock() {
            overrides.insert(document, answer);
        }
        self
    }

    fn answer_for(&self, document: DocumentId) -> Answer {
        let scripted = self
            .overrides
            .lock()
            .ok()
            .and_then(|overrides| overrides.get(&document).cloned());

        scripted.unwrap_or_else(|| {
            Answer::Delay(
                Duration::from_millis(self.config.delay_ms),
                self.config.response.clone(),
            )
        })
    }
}

#[async_trait::async_trait]
impl RecognitionProvider for MockRecognitionProvider {
    async fn recognize(&self, request: &RecognitionRequest) -> Result<RecognitionResponse> {
        let _guard = self.stats.enter();

        match self.answer_for(request.document_id) {
            Answer::Text(text) => Ok(RecognitionResponse::new(text).with_model("mock")),
            Answer::Fail(kind) => Err(Error::new(kind).with_message("scripted mock failure")),
            Answer::Panic => panic!("scripted mock panic for document {}", request.document_id),
            Answer::Delay(delay, text) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(RecognitionResponse::new(text).with_model("mock"))
            }
        }
    }

    async fn health_check(&self) -> Result<ServiceHealth> {
        Ok(ServiceHealth::healthy())
    }
}
