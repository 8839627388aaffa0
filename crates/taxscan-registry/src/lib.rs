#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod cache;
mod client;
mod parse;

pub mod protocol;

#[cfg(feature = "reqwest")]
#[cfg_attr(docsrs, doc(cfg(feature = "reqwest")))]
pub mod reqwest;

pub use cache::LookupCache;
pub use client::RegistryClient;
pub use parse::{RESULT_TABLE_ID, parse_result_table};
pub use protocol::{FormTokens, PostbackForm};
pub use taxscan_core::{Error, ErrorKind, RegistryRecord, Result, ServiceHealth, ServiceStatus};

/// Tracing target for registry lookups.
pub const TRACING_TARGET: &str = "taxscan_registry";

/// Tracing target for the lookup cache.
pub const TRACING_TARGET_CACHE: &str = "taxscan_registry::cache";

/// Opens HTTP sessions against the registry.
///
/// Implement this trait to replace the network layer, e.g. with canned pages
/// in tests.
#[async_trait::async_trait]
pub trait RegistryTransport: Send + Sync {
    /// Opens a fresh session whose cookies persist across both protocol phases.
    async fn open_session(&self) -> Result<Box<dyn RegistrySession>>;

    /// Performs a health check on the transport.
    async fn health_check(&self) -> Result<ServiceHealth>;
}

/// A single cookie-continuous conversation with the registry.
#[async_trait::async_trait]
pub trait RegistrySession: Send {
    /// Fetches the search page carrying the form-state tokens.
    async fn fetch_search_page(&mut self) -> Result<String>;

    /// Submits the partial postback and returns the response body.
    async fn submit_postback(&mut self, form: &PostbackForm) -> Result<String>;
}
