//! Stage handlers.
//!
//! A handler is the unit of scraping work behind a stage name. Generator
//! handlers take no document and run once per run; fan-out handlers take one
//! input document and run once per input record.

mod typed;

pub use typed::{FanOutFn, GeneratorFn};

use crate::context::StageContext;
use crate::core::{DocumentBatch, DocumentError, DocumentType, Record};
use async_trait::async_trait;
use thiserror::Error;

/// Why a handler invocation produced no batch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A fan-out handler was invoked without a record.
    #[error("Fan-out handler invoked without an input document")]
    MissingInput,

    /// The input record does not fit the declared input type.
    #[error("Invalid input document: {0}")]
    Input(#[source] DocumentError),

    /// The output could not be encoded as flat records.
    #[error("Invalid output document: {0}")]
    Output(#[source] DocumentError),

    /// The handler itself failed.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Type-erased stage handler.
///
/// Implement this directly for handlers that work on raw records; use
/// [`GeneratorFn`] and [`FanOutFn`] to lift typed async closures.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// Declared input document type; `None` for generators.
    fn input_type(&self) -> Option<DocumentType>;

    /// Declared output document type.
    fn output_type(&self) -> DocumentType;

    /// Runs the handler once.
    async fn invoke(
        &self,
        ctx: StageContext,
        input: Option<Record>,
    ) -> Result<DocumentBatch, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_messages() {
        assert!(HandlerError::MissingInput.to_string().contains("without an input"));

        let failed = HandlerError::from(anyhow::anyhow!("page timed out"));
        assert_eq!(failed.to_string(), "page timed out");
    }
}
