//! Reqwest-based HTTPS transport for the registry.
//!
//! This module provides a reqwest-based implementation of the
//! [`RegistryTransport`] trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use taxscan_registry::reqwest::{ReqwestTransport, RegistryConfig};
//! use taxscan_registry::RegistryClient;
//!
//! let transport = ReqwestTransport::new(RegistryConfig::default())?;
//! let client: RegistryClient = transport.into_client();
//! let record = client.lookup("131563856").await?;
//! ```
//!
//! [`RegistryTransport`]: crate::RegistryTransport

mod client;
mod config;
mod error;

pub use client::ReqwestTransport;
pub use config::{DEFAULT_REGISTRY_URL, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT, RegistryConfig};
pub use error::{Error, Result};

/// Tracing target for reqwest transport operations.
pub const TRACING_TARGET: &str = "taxscan_registry::reqwest";
