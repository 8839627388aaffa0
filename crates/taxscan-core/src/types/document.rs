//! Submitted documents and their media classification.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Media type of PDF documents.
pub const APPLICATION_PDF: &str = "application/pdf";

/// Stable identifier of a submitted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Serialize, Deserialize, derive_more::Display, derive_more::From)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generates a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

/// How a document is submitted to the recognition service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString)]
#[derive(Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Raster images (JPEG, PNG, HEIC, ...), sent as inline binary content.
    Image,
    /// PDF documents, sent as typed file content.
    Pdf,
    /// Anything else; rejected before any network round-trip.
    Unsupported,
}

impl MediaKind {
    /// Classifies a declared media type such as `image/png; q=0.9`.
    pub fn from_media_type(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            Self::Image
        } else if essence == APPLICATION_PDF {
            Self::Pdf
        } else {
            Self::Unsupported
        }
    }

    /// Returns true for kinds the recognition service accepts.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Maps a file extension to the media type used for submission.
///
/// Mirrors the formats the upload form accepted: jpg, jpeg, png, heic and pdf,
/// plus webp and heif which the recognition service reads as well.
pub fn media_type_from_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "webp" => Some("image/webp"),
        "pdf" => Some(APPLICATION_PDF),
        _ => None,
    }
}

/// A scanned fiscal document submitted for extraction.
///
/// Immutable once constructed; the batch orchestrator moves it into the task
/// that owns it for the duration of the extraction.
#[derive(Clone, PartialEq, Eq)]
pub struct Document {
    id: DocumentId,
    name: String,
    media_type: String,
    content: Bytes,
}

impl Document {
    /// Creates a new document with a fresh identifier.
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            id: DocumentId::new(),
            name: name.into(),
            media_type: media_type.into(),
            content: content.into(),
        }
    }

    /// Replaces the generated identifier.
    pub fn with_id(mut self, id: DocumentId) -> Self {
        self.id = id;
        self
    }

    /// Returns the document identifier.
    pub fn id(&self) -> DocumentId {
        self.id
    }

    /// Returns the display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared media type.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Returns the classification of the declared media type.
    pub fn media_kind(&self) -> MediaKind {
        MediaKind::from_media_type(&self.media_type)
    }

    /// Returns the raw payload.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Returns the payload size in bytes.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Returns the lightweight reference carried alongside outcomes.
    pub fn reference(&self) -> DocumentRef {
        DocumentRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Reference to a submitted document, kept with every outcome for traceability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    /// Identifier of the source document.
    pub id: DocumentId,
    /// Display name of the source document.
    pub name: String,
}
