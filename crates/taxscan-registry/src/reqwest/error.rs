//! Error types for the reqwest registry transport.

use thiserror::Error;

/// Result type alias for reqwest transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reqwest transport operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The registry answered the postback with a non-success status.
    #[error("registry answered with status {0}")]
    Status(reqwest::StatusCode),
    /// The configured registry URL could not be used.
    #[error("invalid registry URL: {0}")]
    InvalidUrl(String),
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) if e.is_builder() => crate::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
            Error::Reqwest(e) => {
                let message = if e.is_timeout() {
                    "Registry request timed out".to_owned()
                } else if e.is_connect() {
                    "Connection to the registry failed".to_owned()
                } else {
                    e.to_string()
                };
                crate::Error::registry_transport()
                    .with_message(message)
                    .with_source(e)
            }
            Error::Status(status) => crate::Error::registry_transport()
                .with_message(format!("registry answered with status {status}")),
            Error::InvalidUrl(url) => crate::Error::configuration()
                .with_message(format!("invalid registry URL: {url}")),
        }
    }
}
