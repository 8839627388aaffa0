//! Runtime configuration.

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use taxscan_core::{Error, Result};

/// Default number of documents extracted at once.
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 4;

/// Default number of registry lookups run at once.
pub const DEFAULT_LOOKUP_LIMIT: usize = 4;

/// Concurrency settings for batches and registry annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct RuntimeConfig {
    /// Maximum number of documents extracted concurrently
    #[cfg_attr(
        feature = "config",
        arg(long = "concurrency", short = 'j', env = "TAXSCAN_CONCURRENCY", default_value = "4")
    )]
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Maximum number of registry lookups run concurrently
    #[cfg_attr(
        feature = "config",
        arg(long = "lookup-concurrency", env = "TAXSCAN_LOOKUP_CONCURRENCY", default_value = "4")
    )]
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: usize,
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_lookup_limit() -> usize {
    DEFAULT_LOOKUP_LIMIT
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            lookup_limit: default_lookup_limit(),
        }
    }
}

impl RuntimeConfig {
    /// Set the extraction concurrency limit.
    #[must_use]
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    /// Set the registry lookup concurrency limit.
    #[must_use]
    pub fn with_lookup_limit(mut self, limit: usize) -> Self {
        self.lookup_limit = limit;
        self
    }

    /// Rejects limits that would stall every batch.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency_limit == 0 {
            return Err(Error::configuration().with_message("concurrency limit must be at least 1"));
        }

        if self.lookup_limit == 0 {
            return Err(
                Error::configuration().with_message("lookup concurrency limit must be at least 1")
            );
        }

        Ok(())
    }
}
