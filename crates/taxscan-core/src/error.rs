//! Structured error handling shared by every taxscan crate.

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur while extracting or validating receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[derive(serde::Serialize, serde::Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input validation failed.
    InvalidInput,
    /// The document's media type is neither an image nor a PDF.
    UnsupportedMediaKind,
    /// The recognition service was unreachable, timed out or answered non-2xx.
    RecognitionTransport,
    /// The recognition service answered with text that is not a receipt list.
    Schema,
    /// The registry page did not carry the expected anti-automation tokens.
    RegistryProtocol,
    /// The registry could not be reached during either protocol phase.
    RegistryTransport,
    /// Configuration error detected before any dispatch.
    Configuration,
    /// The batch was cancelled before this item completed.
    Cancelled,
    /// Internal error.
    Internal,
}

impl ErrorKind {
    /// Check if an operation failing with this kind may succeed when invoked again.
    ///
    /// `Schema` is retryable only by re-invoking the extraction, never by
    /// re-parsing the same text.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RecognitionTransport | Self::RegistryTransport | Self::Schema
        )
    }
}

/// Structured error type with classification and context tracking.
#[must_use]
#[derive(Debug, Error)]
#[error("[{kind}]{}", message.as_ref().map(|m| format!(": {m}")).unwrap_or_default())]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Primary error message.
    pub message: Option<String>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
    /// Additional diagnostic context, e.g. the raw upstream text of a schema error.
    pub context: Option<String>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self {
            kind,
            message: None,
            source: Some(source.into()),
            context: None,
        }
    }

    /// Adds a message to this error.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds context to the error.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Creates a new invalid input error.
    pub fn invalid_input() -> Self {
        Self::new(ErrorKind::InvalidInput)
    }

    /// Creates a new unsupported media kind error.
    pub fn unsupported_media_kind() -> Self {
        Self::new(ErrorKind::UnsupportedMediaKind)
    }

    /// Creates a new recognition transport error.
    pub fn recognition_transport() -> Self {
        Self::new(ErrorKind::RecognitionTransport)
    }

    /// Creates a new schema error carrying the offending raw text.
    pub fn schema(raw: impl Into<String>) -> Self {
        Self::new(ErrorKind::Schema).with_context(raw)
    }

    /// Creates a new registry protocol error.
    pub fn registry_protocol() -> Self {
        Self::new(ErrorKind::RegistryProtocol)
    }

    /// Creates a new registry transport error.
    pub fn registry_transport() -> Self {
        Self::new(ErrorKind::RegistryTransport)
    }

    /// Creates a new configuration error.
    pub fn configuration() -> Self {
        Self::new(ErrorKind::Configuration)
    }

    /// Creates a new cancellation error.
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled)
    }

    /// Creates a new internal error.
    pub fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error kind as a string.
    pub fn kind_str(&self) -> &'static str {
        self.kind.into()
    }

    /// Returns the raw upstream text attached to a schema error.
    pub fn raw_response(&self) -> Option<&str> {
        match self.kind {
            ErrorKind::Schema => self.context.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is retryable based on its kind.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::from_source(ErrorKind::Internal, error).with_message("I/O operation failed")
    }
}
