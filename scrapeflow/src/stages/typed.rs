//! Adapters from typed async closures to [`StageHandler`].

use super::{HandlerError, StageHandler};
use crate::context::StageContext;
use crate::core::{from_record, Document, DocumentBatch, DocumentType, IntoDocuments, Record};
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;

fn encode_output<R: IntoDocuments>(output: R) -> Result<DocumentBatch, HandlerError> {
    DocumentBatch::from_documents(&output.into_documents()).map_err(HandlerError::Output)
}

/// A generator: `async fn(StageContext) -> anyhow::Result<R>`.
pub struct GeneratorFn<F, Fut, R> {
    func: F,
    _marker: PhantomData<fn() -> (Fut, R)>,
}

impl<F, Fut, R> GeneratorFn<F, Fut, R>
where
    F: Fn(StageContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: IntoDocuments + Send + 'static,
{
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, Fut, R> fmt::Debug for GeneratorFn<F, Fut, R>
where
    R: IntoDocuments,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratorFn")
            .field("output", &DocumentType::of::<R::Doc>())
            .finish()
    }
}

#[async_trait]
impl<F, Fut, R> StageHandler for GeneratorFn<F, Fut, R>
where
    F: Fn(StageContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: IntoDocuments + Send + 'static,
{
    fn input_type(&self) -> Option<DocumentType> {
        None
    }

    fn output_type(&self) -> DocumentType {
        DocumentType::of::<R::Doc>()
    }

    async fn invoke(
        &self,
        ctx: StageContext,
        _input: Option<Record>,
    ) -> Result<DocumentBatch, HandlerError> {
        let output = (self.func)(ctx).await?;
        encode_output(output)
    }
}

/// A fan-out handler: `async fn(StageContext, I) -> anyhow::Result<R>`.
pub struct FanOutFn<F, I, Fut, R> {
    func: F,
    _marker: PhantomData<fn(I) -> (Fut, R)>,
}

impl<F, I, Fut, R> FanOutFn<F, I, Fut, R>
where
    F: Fn(StageContext, I) -> Fut + Send + Sync + 'static,
    I: Document,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: IntoDocuments + Send + 'static,
{
    /// Wraps `func`.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, I, Fut, R> fmt::Debug for FanOutFn<F, I, Fut, R>
where
    I: Document,
    R: IntoDocuments,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutFn")
            .field("input", &DocumentType::of::<I>())
            .field("output", &DocumentType::of::<R::Doc>())
            .finish()
    }
}

#[async_trait]
impl<F, I, Fut, R> StageHandler for FanOutFn<F, I, Fut, R>
where
    F: Fn(StageContext, I) -> Fut + Send + Sync + 'static,
    I: Document,
    Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
    R: IntoDocuments + Send + 'static,
{
    fn input_type(&self) -> Option<DocumentType> {
        Some(DocumentType::of::<I>())
    }

    fn output_type(&self) -> DocumentType {
        DocumentType::of::<R::Doc>()
    }

    async fn invoke(
        &self,
        ctx: StageContext,
        input: Option<Record>,
    ) -> Result<DocumentBatch, HandlerError> {
        let record = input.ok_or(HandlerError::MissingInput)?;
        let document: I = from_record(&record).map_err(HandlerError::Input)?;
        let output = (self.func)(ctx, document).await?;
        encode_output(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScraperConfig;
    use crate::core::{url_record, BaseDocument};
    use crate::testing::MockDriver;
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct City {
        link: String,
        name: String,
    }

    impl Document for City {
        fn link(&self) -> &str {
            &self.link
        }
    }

    fn ctx() -> StageContext {
        StageContext::new(
            "test",
            Uuid::new_v4(),
            Arc::new(MockDriver::new()),
            None,
            Arc::new(ScraperConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_generator_fn() {
        let handler = GeneratorFn::new(|_ctx: StageContext| async {
            anyhow::Ok(vec![BaseDocument::new("https://a"), BaseDocument::new("https://b")])
        });

        assert_eq!(handler.input_type(), None);
        assert_eq!(handler.output_type(), DocumentType::of::<BaseDocument>());

        let batch = handler.invoke(ctx(), None).await.unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[tokio::test]
    async fn test_fan_out_fn_decodes_input() {
        let handler = FanOutFn::new(|_ctx: StageContext, doc: BaseDocument| async move {
            anyhow::Ok(City {
                name: doc.link.trim_start_matches("https://").to_string(),
                link: doc.link,
            })
        });

        assert_eq!(handler.input_type(), Some(DocumentType::of::<BaseDocument>()));

        let batch = handler.invoke(ctx(), Some(url_record("https://vancouver"))).await.unwrap();
        assert_eq!(batch.doc_type(), DocumentType::of::<City>());
        assert_eq!(batch.decode::<City>().unwrap()[0].name, "vancouver");
    }

    #[tokio::test]
    async fn test_fan_out_fn_rejects_bad_input() {
        let handler = FanOutFn::new(|_ctx: StageContext, city: City| async move { anyhow::Ok(Some(city)) });

        let err = handler.invoke(ctx(), Some(url_record("https://a"))).await.unwrap_err();
        assert!(matches!(err, HandlerError::Input(_)));

        let err = handler.invoke(ctx(), None).await.unwrap_err();
        assert!(matches!(err, HandlerError::MissingInput));
    }

    #[tokio::test]
    async fn test_handler_failure_is_wrapped() {
        let handler = GeneratorFn::new(|_ctx: StageContext| async {
            Err::<Vec<BaseDocument>, _>(anyhow::anyhow!("captcha"))
        });

        let err = handler.invoke(ctx(), None).await.unwrap_err();
        assert!(matches!(err, HandlerError::Failed(_)));
        assert_eq!(err.to_string(), "captcha");
    }
}
