//! Mock implementations of the recognition service and the registry.
//!
//! These mocks never touch the network. They are instrumented so tests can
//! assert on call counts and concurrency.

mod recognition;
mod registry;

pub use recognition::{MockRecognitionConfig, MockRecognitionProvider, MockStats, SAMPLE_RECEIPTS};
pub use registry::{MockRegistryTransport, REGISTRY_SEARCH_PAGE, registry_result_page};
use taxscan_inference::ExtractionClient;

/// Creates an extraction client backed by a default mock provider.
pub fn create_mock_extraction() -> ExtractionClient {
    ExtractionClient::new(MockRecognitionProvider::default())
}
