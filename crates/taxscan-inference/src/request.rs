//! Requests sent to the recognition service.

use bytes::Bytes;
use serde_json::Value;
use taxscan_core::{Document, DocumentId, MediaKind};

use crate::{Error, Result, schema};

/// Sampling temperature for every extraction; output must be deterministic.
pub const TEMPERATURE: f32 = 0.0;

const FIELD_RULES: &str = "\
For every receipt return:
- rnc: the vendor's RNC or cédula, digits only.
- ncf: the fiscal document number (NCF or e-NCF) exactly as printed.
- date: the issue date as DD/MM/YYYY.
- total: the final amount paid.
- itbis: the ITBIS amount, 0 if absent.
- isc: the selective consumption tax (ISC), 0 if absent.
- other_taxes: any other tax or fee, 0 if absent.
- tips: the legal tip (propina legal, 10%), 0 if absent.
- subtotal: total minus itbis.
Amounts are plain numbers without currency symbols or thousands separators. \
Never invent a value that is not printed on the receipt.";

/// Instructions for a photographed or scanned single receipt.
pub const IMAGE_INSTRUCTIONS: &str = "\
Read the Dominican fiscal receipt (comprobante fiscal) in this image and \
return it as a JSON array with one object.";

/// Instructions for a PDF that may hold several receipts.
pub const PDF_INSTRUCTIONS: &str = "\
Read every Dominican fiscal receipt (comprobante fiscal) in this PDF, one per \
page or section, and return them as a JSON array with one object per receipt.";

/// How the document bytes are attached to the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPart {
    /// Image bytes sent inline.
    InlineBinary {
        /// Declared media type of the image.
        media_type: String,
        /// Raw image bytes.
        data: Bytes,
    },
    /// A typed file, used for PDFs.
    TypedFile {
        /// Declared media type of the file.
        media_type: String,
        /// Raw file bytes.
        data: Bytes,
    },
}

impl DocumentPart {
    /// Builds the part for `document`, rejecting unsupported media kinds.
    pub fn from_document(document: &Document) -> Result<Self> {
        let media_type = document.media_type().to_owned();
        let data = document.content().clone();

        match document.media_kind() {
            MediaKind::Image => Ok(Self::InlineBinary { media_type, data }),
            MediaKind::Pdf => Ok(Self::TypedFile { media_type, data }),
            MediaKind::Unsupported => Err(Error::unsupported_media_kind().with_message(format!(
                "'{}' has unsupported media type '{}'",
                document.name(),
                document.media_type()
            ))),
        }
    }

    /// Returns the declared media type.
    pub fn media_type(&self) -> &str {
        match self {
            Self::InlineBinary { media_type, .. } | Self::TypedFile { media_type, .. } => {
                media_type
            }
        }
    }

    /// Returns the raw bytes.
    pub fn data(&self) -> &Bytes {
        match self {
            Self::InlineBinary { data, .. } | Self::TypedFile { data, .. } => data,
        }
    }
}

/// A schema-constrained extraction request for one document.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Document the request was built from.
    pub document_id: DocumentId,
    /// The document content.
    pub part: DocumentPart,
    /// Fixed instructions for the document's kind.
    pub instructions: String,
    /// Shape the answer must follow.
    pub response_schema: Value,
    /// Sampling temperature.
    pub temperature: f32,
}

impl RecognitionRequest {
    /// Builds the request for `document`.
    ///
    /// Fails with `UnsupportedMediaKind` for anything but images and PDFs.
    pub fn for_document(document: &Document) -> Result<Self> {
        let part = DocumentPart::from_document(document)?;
        let lead = match part {
            DocumentPart::InlineBinary { .. } => IMAGE_INSTRUCTIONS,
            DocumentPart::TypedFile { .. } => PDF_INSTRUCTIONS,
        };

        Ok(Self {
            document_id: document.id(),
            part,
            instructions: format!("{lead}\n\n{FIELD_RULES}"),
            response_schema: schema::receipt_list_schema(),
            temperature: TEMPERATURE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_is_inline() {
        let document = Document::new("a.jpg", "image/jpeg", vec![0xFF, 0xD8]);
        let request = RecognitionRequest::for_document(&document).unwrap();

        assert!(matches!(request.part, DocumentPart::InlineBinary { .. }));
        assert_eq!(request.part.media_type(), "image/jpeg");
        assert!(request.instructions.starts_with(IMAGE_INSTRUCTIONS));
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.document_id, document.id());
    }

    #[test]
    fn test_pdf_is_typed_file() {
        let document = Document::new("batch.pdf", "application/pdf", b"%PDF-1.7".to_vec());
        let request = RecognitionRequest::for_document(&document).unwrap();

        assert!(matches!(request.part, DocumentPart::TypedFile { .. }));
        assert_eq!(request.part.data().as_ref(), b"%PDF-1.7");
        assert!(request.instructions.starts_with(PDF_INSTRUCTIONS));
    }

    #[test]
    fn test_unsupported_is_rejected() {
        let document = Document::new("notes.txt", "text/plain", b"hello".to_vec());
        let error = RecognitionRequest::for_document(&document).unwrap_err();
        assert_eq!(error.kind, crate::ErrorKind::UnsupportedMediaKind);
    }
}
