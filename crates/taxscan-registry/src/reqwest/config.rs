//! Registry transport configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Public search page of the DGII taxpayer registry.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://dgii.gov.do/app/WebApps/ConsultasWeb2/ConsultasWeb/consultas/rnc.aspx";

/// Default timeout for each registry request: 30 seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Mobile browser identity the registry serves its regular page to.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/135.0.0.0 Mobile Safari/537.36";

/// Configuration for the reqwest registry transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct RegistryConfig {
    /// URL of the registry search page
    #[cfg_attr(
        feature = "config",
        arg(
            long = "registry-url",
            env = "REGISTRY_URL",
            default_value = DEFAULT_REGISTRY_URL
        )
    )]
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Timeout for each registry request in seconds
    #[cfg_attr(
        feature = "config",
        arg(long = "registry-timeout", env = "REGISTRY_TIMEOUT", default_value = "30")
    )]
    #[serde(default = "default_timeout_secs")]
    pub registry_timeout: u64,

    /// User-Agent header presented to the registry
    #[cfg_attr(
        feature = "config",
        arg(long = "registry-user-agent", env = "REGISTRY_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Accept the registry's certificate even when it does not verify
    #[cfg_attr(
        feature = "config",
        arg(
            long = "registry-accept-invalid-certs",
            env = "REGISTRY_ACCEPT_INVALID_CERTS",
            default_value_t = false
        )
    )]
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_owned()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            registry_timeout: default_timeout_secs(),
            user_agent: None,
            accept_invalid_certs: false,
        }
    }
}

impl RegistryConfig {
    /// Returns the effective timeout, using default if zero.
    pub fn effective_timeout(&self) -> Duration {
        if self.registry_timeout == 0 {
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        } else {
            Duration::from_secs(self.registry_timeout)
        }
    }

    /// Returns the effective user agent, using the browser identity if not set.
    pub fn effective_user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Set the registry search page URL.
    #[must_use]
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.registry_timeout = timeout_secs;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Accept certificates that fail verification.
    #[must_use]
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}
