//! Data types shared across the taxscan workspace.
//!
//! - **Document**: an immutable scanned payload with its declared media type
//! - **ExtractedRecord**: one receipt read from a document
//! - **RegistryRecord**: the open key/value record scraped from the fiscal registry

mod document;
mod record;
mod registry;

pub use document::{
    APPLICATION_PDF, Document, DocumentId, DocumentRef, MediaKind, media_type_from_extension,
};
pub use record::{
    AMOUNT_TOLERANCE, ConsistencyWarning, ExtractedRecord, amounts_match, round_cents,
};
pub use registry::{FIELD_NAME, FIELD_STATUS, RegistryRecord};
