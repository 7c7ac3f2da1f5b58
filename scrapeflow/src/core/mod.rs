//! Core domain model types for scrapeflow.
//!
//! This module contains the fundamental types used throughout the engine:
//! - Documents, document types and type-erased batches
//! - Run status and executor states
//! - Per-run results

mod document;
mod result;
mod status;

pub use document::{
    from_record, record_identity, to_record, url_record, BaseDocument, Document, DocumentBatch,
    DocumentError, DocumentType, IntoDocuments, Record,
};
pub(crate) use document::json_kind;
pub use result::{ExecutionResult, ItemStats, RunOutcome};
pub use status::{ExecutionState, RunStatus};
