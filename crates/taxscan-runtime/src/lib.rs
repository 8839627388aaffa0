#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod annotate;
mod config;
mod service;

pub mod batch;

pub use annotate::{AnnotatedRecord, RegistryStatus, annotate};
pub use batch::{BatchEvent, BatchOrchestrator, BatchStream, TaskBoard, TaskState};
pub use config::{DEFAULT_CONCURRENCY_LIMIT, DEFAULT_LOOKUP_LIMIT, RuntimeConfig};
pub use service::{RuntimeHealth, Taxscan};
pub use taxscan_core::{Error, ErrorKind, Result};

/// Tracing target for the runtime facade.
pub const TRACING_TARGET: &str = "taxscan_runtime";

/// Tracing target for batch orchestration.
pub const TRACING_TARGET_BATCH: &str = "taxscan_runtime::batch";

/// Tracing target for registry annotation.
pub const TRACING_TARGET_ANNOTATE: &str = "taxscan_runtime::annotate";
