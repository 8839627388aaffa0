#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod mock;

pub use mock::{
    MockRecognitionConfig, MockRecognitionProvider, MockRegistryTransport, MockStats,
    REGISTRY_SEARCH_PAGE, SAMPLE_RECEIPTS, create_mock_extraction, registry_result_page,
};
