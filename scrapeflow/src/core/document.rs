//! Documents: the typed records passed between stages.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Flat field-map encoding of one document.
pub type Record = serde_json::Map<String, Value>;

/// A typed, field-comparable record produced or consumed by a stage.
///
/// Implementors are plain serde structs whose fields serialize to JSON
/// primitives. Two documents are the same document iff every field matches.
///
/// A run with a URL override feeds the consumer one record holding only
/// `link`. A type can take that record only if every other field is
/// `#[serde(default)]` (or an `Option`); otherwise the item fails to decode.
///
/// ```rust,ignore
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct City {
///     link: String,
///     name: String,
/// }
///
/// impl Document for City {
///     fn link(&self) -> &str {
///         &self.link
///     }
/// }
/// ```
pub trait Document:
    Serialize + DeserializeOwned + Clone + PartialEq + fmt::Debug + Send + Sync + 'static
{
    /// The link/identity field.
    fn link(&self) -> &str;
}

/// The minimal document: a link and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseDocument {
    /// The document link.
    pub link: String,
}

impl BaseDocument {
    /// Creates a base document.
    #[must_use]
    pub fn new(link: impl Into<String>) -> Self {
        Self { link: link.into() }
    }
}

impl Document for BaseDocument {
    fn link(&self) -> &str {
        &self.link
    }
}

/// Runtime identity of a document type.
///
/// Equality is exact type identity: two structurally identical structs are
/// still different document types.
#[derive(Clone, Copy)]
pub struct DocumentType {
    id: TypeId,
    name: &'static str,
}

impl DocumentType {
    /// Returns the identity of `T`.
    #[must_use]
    pub fn of<T: Document>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Fully qualified type name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for DocumentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DocumentType {}

impl Hash for DocumentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DocumentType").field(&self.short_name()).finish()
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Errors converting between documents and records.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The document did not serialize to a flat object.
    #[error("Document of type '{type_name}' must encode as an object, got {found}")]
    NotAnObject {
        /// The document type.
        type_name: String,
        /// JSON kind that was produced instead.
        found: &'static str,
    },

    /// Serialization failed.
    #[error("Failed to encode '{type_name}': {source}")]
    Encode {
        /// The document type.
        type_name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// The record does not fit the document type.
    #[error("Failed to build '{type_name}' from record: {source}")]
    Decode {
        /// The document type.
        type_name: String,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Encodes a document as a flat record.
pub fn to_record<T: Document>(document: &T) -> Result<Record, DocumentError> {
    let type_name = DocumentType::of::<T>().short_name().to_string();
    match serde_json::to_value(document) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(DocumentError::NotAnObject {
            type_name,
            found: json_kind(&other),
        }),
        Err(source) => Err(DocumentError::Encode { type_name, source }),
    }
}

/// Builds a document of type `T` from a record.
pub fn from_record<T: Document>(record: &Record) -> Result<T, DocumentError> {
    serde_json::from_value(Value::Object(record.clone())).map_err(|source| DocumentError::Decode {
        type_name: DocumentType::of::<T>().short_name().to_string(),
        source,
    })
}

/// The synthetic record used for a single-URL run.
#[must_use]
pub fn url_record(url: &str) -> Record {
    let mut record = Record::new();
    record.insert("link".to_string(), Value::String(url.to_string()));
    record
}

/// A short identity for log lines: the `link` field, else the compact JSON.
#[must_use]
pub fn record_identity(record: &Record) -> String {
    match record.get("link") {
        Some(Value::String(link)) => link.clone(),
        _ => Value::Object(record.clone()).to_string(),
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Values a handler may return: one document, an optional one, or a list.
pub trait IntoDocuments {
    /// The document type produced.
    type Doc: Document;

    /// Flattens into a list.
    fn into_documents(self) -> Vec<Self::Doc>;
}

impl<T: Document> IntoDocuments for T {
    type Doc = T;

    fn into_documents(self) -> Vec<T> {
        vec![self]
    }
}

impl<T: Document> IntoDocuments for Vec<T> {
    type Doc = T;

    fn into_documents(self) -> Vec<T> {
        self
    }
}

impl<T: Document> IntoDocuments for Option<T> {
    type Doc = T;

    fn into_documents(self) -> Vec<T> {
        self.into_iter().collect()
    }
}

/// A type-erased, homogeneous collection of documents.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBatch {
    doc_type: DocumentType,
    records: Vec<Record>,
}

impl DocumentBatch {
    /// Creates a batch from pre-encoded records.
    #[must_use]
    pub fn new(doc_type: DocumentType, records: Vec<Record>) -> Self {
        Self { doc_type, records }
    }

    /// Creates an empty batch.
    #[must_use]
    pub fn empty(doc_type: DocumentType) -> Self {
        Self::new(doc_type, Vec::new())
    }

    /// Encodes typed documents.
    pub fn from_documents<T: Document>(documents: &[T]) -> Result<Self, DocumentError> {
        let records = documents.iter().map(to_record).collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(DocumentType::of::<T>(), records))
    }

    /// Decodes back into typed documents.
    pub fn decode<T: Document>(&self) -> Result<Vec<T>, DocumentError> {
        self.records.iter().map(from_record).collect()
    }

    /// The document type of every record.
    #[must_use]
    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    /// The encoded records.
    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Consumes the batch into its records.
    #[must_use]
    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if the batch holds no documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
