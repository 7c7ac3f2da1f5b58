//! Order-preserving deduplication of handler output.

use crate::core::{DocumentBatch, DocumentType, Record};
use serde_json::Value;
use std::collections::HashSet;

/// Field-equality key of a record. Map keys are ordered, so the compact JSON
/// is canonical.
fn record_key(record: &Record) -> String {
    Value::Object(record.clone()).to_string()
}

/// Accumulates the output of one run, keeping first occurrences only.
#[derive(Debug)]
pub struct Aggregator {
    doc_type: DocumentType,
    seen: HashSet<String>,
    records: Vec<Record>,
}

impl Aggregator {
    /// Creates an empty aggregator for `doc_type`.
    #[must_use]
    pub fn new(doc_type: DocumentType) -> Self {
        Self {
            doc_type,
            seen: HashSet::new(),
            records: Vec::new(),
        }
    }

    /// Adds a record. Returns false if an equal record is already present.
    pub fn push(&mut self, record: Record) -> bool {
        if self.seen.insert(record_key(&record)) {
            self.records.push(record);
            true
        } else {
            false
        }
    }

    /// Adds every record of `batch`; returns how many were new.
    pub fn extend(&mut self, batch: DocumentBatch) -> usize {
        batch
            .into_records()
            .into_iter()
            .map(|record| usize::from(self.push(record)))
            .sum()
    }

    /// Distinct records so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The deduplicated batch.
    #[must_use]
    pub fn into_batch(self) -> DocumentBatch {
        DocumentBatch::new(self.doc_type, self.records)
    }
}

/// Deduplicates `records`, keeping the first occurrence of each.
#[must_use]
pub fn dedup_records(doc_type: DocumentType, records: Vec<Record>) -> DocumentBatch {
    let mut aggregator = Aggregator::new(doc_type);
    for record in records {
        aggregator.push(record);
    }
    aggregator.into_batch()
}
