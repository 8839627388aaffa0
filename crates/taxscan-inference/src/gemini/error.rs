//! Error types for the Gemini provider.

use thiserror::Error;

/// Result type alias for Gemini operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Gemini operations.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("Gemini answered with status {status}: {message}")]
    Status {
        /// HTTP status of the answer.
        status: reqwest::StatusCode,
        /// Message from the service's error envelope, or the raw body.
        message: String,
    },
}

impl From<Error> for crate::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Reqwest(e) if e.is_builder() => crate::Error::configuration()
                .with_message(e.to_string())
                .with_source(e),
            Error::Reqwest(e) => {
                let message = if e.is_timeout() {
                    "Recognition request timed out".to_owned()
                } else if e.is_connect() {
                    "Connection to the recognition service failed".to_owned()
                } else {
                    e.to_string()
                };
                crate::Error::recognition_transport()
                    .with_message(message)
                    .with_source(e)
            }
            status @ Error::Status { .. } => crate::Error::recognition_transport()
                .with_message(status.to_string()),
        }
    }
}
