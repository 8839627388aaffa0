#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod health;

pub mod types;
pub mod validation;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use health::{ServiceHealth, ServiceStatus};
pub use types::{
    ConsistencyWarning, Document, DocumentId, DocumentRef, ExtractedRecord, MediaKind,
    RegistryRecord,
};
pub use validation::{
    RecordCheck, is_valid_fiscal_document_number, is_valid_tax_id, normalize_tax_id,
    parse_receipt_date,
};
