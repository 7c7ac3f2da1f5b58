//! Stage execution.
//!
//! One call to [`StageExecutor::run`] runs one stage from input resolution to
//! cleanup:
//!
//! ```text
//! Idle → ResolvingInput → Running → Aggregating → Persisting → Cleanup → Done
//! ```
//!
//! A stage-level error skips straight to `Persisting`; `Cleanup` and `Done`
//! are always reached. Failures of a single fan-out item are logged, counted
//! and skipped. Nothing escapes `run`: fatal errors come back as an
//! [`ExecutionResult`] with status `ERROR`.

mod aggregate;
mod delay;

pub use aggregate::{dedup_records, Aggregator};
pub use delay::PolitenessDelay;

use crate::browser::DriverSession;
use crate::context::{RunContext, StageContext};
use crate::core::{
    record_identity, url_record, DocumentBatch, ExecutionResult, ExecutionState, ItemStats, Record,
    RunOutcome,
};
use crate::errors::ScrapeflowError;
use crate::events::{types, EventSink, NoOpEventSink, RunEvent};
use crate::interceptor::Interceptor;
use crate::observability::stage_dispatch;
use crate::persistence::ArtifactStore;
use crate::pipeline::RunRequest;
use crate::registry::{StageDescriptor, StageInput, StageRegistry, TypeResolver};
use crate::stages::HandlerError;
use crate::utils::new_run_id;
use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::instrument::WithSubscriber;
use tracing::{debug, error, info, warn, Instrument};
use uuid::Uuid;

/// Runs registered stages.
pub struct StageExecutor {
    registry: Arc<StageRegistry>,
    store: Arc<dyn ArtifactStore>,
    delay: Option<PolitenessDelay>,
    events: Arc<dyn EventSink>,
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("stages", &self.registry.all())
            .field("store", &self.store)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

/// Resources held during a run, released at cleanup.
#[derive(Default)]
struct Held {
    session: Option<DriverSession>,
    interceptor: Option<Arc<dyn Interceptor>>,
}

/// Mutable bookkeeping of one run.
struct RunState {
    run_id: Uuid,
    states: Vec<ExecutionState>,
    items: ItemStats,
}

impl RunState {
    fn enter(&mut self, state: ExecutionState) {
        debug!(state = %state, "Executor state");
        self.states.push(state);
    }
}

impl StageExecutor {
    /// Creates an executor. The politeness delay defaults to the run
    /// configuration's bounds; events are discarded.
    #[must_use]
    pub fn new(registry: Arc<StageRegistry>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            registry,
            store,
            delay: None,
            events: Arc::new(NoOpEventSink),
        }
    }

    /// Uses a fixed politeness delay instead of the configured one.
    #[must_use]
    pub fn with_politeness(mut self, delay: PolitenessDelay) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Sends lifecycle events to `events`.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// The registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// The artifact store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Runs one stage.
    ///
    /// A stage with file logging enabled logs to its own file for the length
    /// of the run; other runs keep the ambient subscriber.
    pub async fn run(&self, request: &RunRequest, ctx: &RunContext) -> RunOutcome {
        let run_id = new_run_id();
        let make_span =
            || tracing::info_span!("stage_run", stage = %request.stage, run_id = %run_id);

        match self.file_dispatch(&request.stage) {
            Some(dispatch) => {
                let span = tracing::dispatcher::with_default(&dispatch, make_span);
                self.run_inner(request, ctx, run_id)
                    .instrument(span)
                    .with_subscriber(dispatch)
                    .await
            }
            None => self.run_inner(request, ctx, run_id).instrument(make_span()).await,
        }
    }

    fn file_dispatch(&self, stage: &str) -> Option<tracing::Dispatch> {
        let options = self.registry.get(stage).ok()?.logging();
        if !options.enable_file_logging {
            return None;
        }
        match stage_dispatch(stage, options) {
            Ok(dispatch) => Some(dispatch),
            Err(e) => {
                warn!(stage = %stage, error = %e, "Could not set up file logging");
                None
            }
        }
    }

    async fn run_inner(&self, request: &RunRequest, ctx: &RunContext, run_id: Uuid) -> RunOutcome {
        let started_at = Utc::now();
        let stage = request.stage.as_str();
        let mut run = RunState {
            run_id,
            states: vec![ExecutionState::Idle],
            items: ItemStats::default(),
        };

        self.emit(
            RunEvent::new(types::STAGE_STARTED, stage, run_id).with_data(json!({ "url": request.url })),
        )
        .await;

        let descriptor = match self.registry.get(stage) {
            Ok(descriptor) => descriptor,
            Err(err) => {
                error!(stage = %stage, "Unknown stage requested");
                run.enter(ExecutionState::Cleanup);
                let result =
                    ExecutionResult::error(stage, run_id, started_at, &err, run.items, 0);
                return self.finish(run, result, None, None).await;
            }
        };

        info!(stage = %stage, url = ?request.url, "Starting stage");

        let mut held = Held::default();
        let mut aggregate = Aggregator::new(descriptor.output_type());
        let mut outcome = self
            .execute(descriptor, request, ctx, &mut run, &mut held, &mut aggregate)
            .await;

        if let Err(err) = &outcome {
            error!(stage = %stage, error = %err, kind = %err.kind(), "Stage failed");
        }

        run.enter(ExecutionState::Persisting);
        let documents = aggregate.into_batch();
        let artifact = match self.persist(descriptor, &documents, &run).await {
            Ok(path) => Some(path),
            Err(err) => {
                error!(stage = %stage, error = %err, "Failed to write artifact");
                if outcome.is_ok() {
                    outcome = Err(err);
                }
                None
            }
        };

        run.enter(ExecutionState::Cleanup);
        Self::cleanup(&mut held).await;

        let result = match &outcome {
            Ok(()) => ExecutionResult::success(stage, run_id, started_at, run.items, documents.len()),
            Err(err) => {
                ExecutionResult::error(stage, run_id, started_at, err, run.items, documents.len())
            }
        };
        self.finish(run, result, Some(documents), artifact).await
    }

    /// Acquire, resolve, run and aggregate. Stage-level errors end it early.
    async fn execute(
        &self,
        descriptor: &StageDescriptor,
        request: &RunRequest,
        ctx: &RunContext,
        run: &mut RunState,
        held: &mut Held,
        aggregate: &mut Aggregator,
    ) -> Result<(), ScrapeflowError> {
        if let Some(interceptor) = ctx.interceptor() {
            interceptor
                .start()
                .await
                .map_err(|e| ScrapeflowError::resource(format!("failed to start interceptor: {e:#}")))?;
            held.interceptor = Some(Arc::clone(interceptor));
        }
        held.session = Some(DriverSession::acquire(Arc::clone(ctx.driver()), ctx.config()).await?);

        run.enter(ExecutionState::ResolvingInput);
        let input = self.resolve_input(descriptor, request, run.run_id).await?;

        run.enter(ExecutionState::Running);
        let stage_ctx = ctx.stage_context(descriptor.name(), run.run_id);
        match input {
            None => Self::run_generator(descriptor, stage_ctx, aggregate).await?,
            Some(records) => {
                let delay = self
                    .delay
                    .unwrap_or_else(|| PolitenessDelay::from_config(ctx.config()));
                self.run_fan_out(descriptor, stage_ctx, records, delay, run, aggregate)
                    .await;
            }
        }

        run.enter(ExecutionState::Aggregating);
        debug!(stage = %descriptor.name(), documents = aggregate.len(), "Aggregated output");
        Ok(())
    }

    /// `None` for a generator run, else the records to fan out over.
    async fn resolve_input(
        &self,
        descriptor: &StageDescriptor,
        request: &RunRequest,
        run_id: Uuid,
    ) -> Result<Option<Vec<Record>>, ScrapeflowError> {
        let stage = descriptor.name();

        if descriptor.is_generator() {
            if let Some(url) = &request.url {
                warn!(stage = %stage, url = %url, "Generator stage takes no input, ignoring URL");
            }
            return Ok(None);
        }

        let (records, source) = if let Some(url) = &request.url {
            (vec![url_record(url)], json!({ "kind": "url", "url": url }))
        } else {
            match descriptor.input() {
                StageInput::File(path) => (
                    self.store.read(path)?,
                    json!({ "kind": "file", "path": path.display().to_string() }),
                ),
                StageInput::Producer(producer) => {
                    let produced = std::panic::catch_unwind(AssertUnwindSafe(|| producer()))
                        .unwrap_or_else(|panic| {
                            Err(anyhow::anyhow!("input producer panicked: {}", panic_message(&*panic)))
                        });
                    let records = produced.map_err(|e| ScrapeflowError::Input {
                        stage: stage.to_string(),
                        message: format!("{e:#}"),
                    })?;
                    (records, json!({ "kind": "producer" }))
                }
                StageInput::Auto => {
                    let resolution = TypeResolver::resolve(&self.registry, stage)?;
                    let path = self.store.artifact_path(&resolution.producer);
                    (
                        self.store.read(&path)?,
                        json!({
                            "kind": "auto",
                            "producer": resolution.producer,
                            "path": path.display().to_string(),
                        }),
                    )
                }
            }
        };

        info!(stage = %stage, count = records.len(), "Resolved input");
        self.emit(
            RunEvent::new(types::STAGE_INPUT_RESOLVED, stage, run_id)
                .with_data(json!({ "count": records.len(), "source": source })),
        )
        .await;

        Ok(Some(records))
    }

    async fn run_generator(
        descriptor: &StageDescriptor,
        ctx: StageContext,
        aggregate: &mut Aggregator,
    ) -> Result<(), ScrapeflowError> {
        let stage = descriptor.name();
        let batch = invoke(descriptor, ctx, None)
            .await
            .map_err(|failure| failure.into_error(descriptor, None))?;
        let added = aggregate.extend(batch);
        debug!(stage = %stage, added, "Generator produced documents");
        Ok(())
    }

    async fn run_fan_out(
        &self,
        descriptor: &StageDescriptor,
        ctx: StageContext,
        records: Vec<Record>,
        delay: PolitenessDelay,
        run: &mut RunState,
        aggregate: &mut Aggregator,
    ) {
        let stage = descriptor.name();
        run.items.total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            if index > 0 {
                delay.wait().await;
            }

            let identity = record_identity(&record);
            match invoke(descriptor, ctx.clone(), Some(record)).await {
                Ok(batch) => {
                    let added = aggregate.extend(batch);
                    debug!(stage = %stage, item = %identity, added, "Processed item");
                }
                Err(failure) => {
                    let err = failure.into_error(descriptor, Some(&identity));
                    run.items.failed += 1;
                    warn!(stage = %stage, item = %identity, error = %err, "Skipping item");
                    self.emit(
                        RunEvent::new(types::ITEM_FAILED, stage, run.run_id)
                            .with_data(json!({ "item": identity, "error": err.to_string() })),
                    )
                    .await;
                }
            }
        }

        info!(
            stage = %stage,
            total = run.items.total,
            failed = run.items.failed,
            "Processed items"
        );
    }

    /// Save hook, then artifact write.
    async fn persist(
        &self,
        descriptor: &StageDescriptor,
        documents: &DocumentBatch,
        run: &RunState,
    ) -> Result<PathBuf, ScrapeflowError> {
        let stage = descriptor.name();

        if let Some(hook) = descriptor.save_hook() {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| hook(documents)))
                .unwrap_or_else(|panic| {
                    Err(anyhow::anyhow!("save hook panicked: {}", panic_message(&*panic)))
                });
            if let Err(e) = outcome {
                warn!(stage = %stage, error = %format!("{e:#}"), "Save hook failed");
            }
        }

        let path = self.store.write(stage, documents.records())?;
        info!(stage = %stage, path = %path.display(), count = documents.len(), "Saved documents");
        self.emit(
            RunEvent::new(types::STAGE_PERSISTED, stage, run.run_id).with_data(json!({
                "path": path.display().to_string(),
                "count": documents.len(),
            })),
        )
        .await;
        Ok(path)
    }

    async fn cleanup(held: &mut Held) {
        if let Some(session) = held.session.as_mut() {
            if let Err(e) = session.release().await {
                warn!(error = %format!("{e:#}"), "Failed to close driver");
            }
        }
        if let Some(interceptor) = held.interceptor.take() {
            if let Err(e) = interceptor.stop().await {
                warn!(error = %format!("{e:#}"), "Failed to stop interceptor");
            }
        }
    }

    async fn finish(
        &self,
        mut run: RunState,
        result: ExecutionResult,
        documents: Option<DocumentBatch>,
        artifact: Option<PathBuf>,
    ) -> RunOutcome {
        let event_type = if result.is_success() {
            info!(
                stage = %result.stage,
                documents = result.documents,
                failed_items = result.items.failed,
                "Stage completed"
            );
            types::STAGE_COMPLETED
        } else {
            types::STAGE_FAILED
        };
        self.emit(
            RunEvent::new(event_type, result.stage.clone(), run.run_id).with_data(json!({
                "status": result.status,
                "documents": result.documents,
                "items": result.items,
                "error_kind": result.error_kind,
                "message": result.message,
            })),
        )
        .await;

        run.enter(ExecutionState::Done);
        let documents = documents.unwrap_or_else(|| {
            DocumentBatch::empty(crate::core::DocumentType::of::<crate::core::BaseDocument>())
        });

        RunOutcome {
            documents,
            result,
            artifact,
            states: run.states,
        }
    }

    async fn emit(&self, event: RunEvent) {
        self.events.emit(event).await;
    }
}

/// Why one invocation produced nothing.
enum Failure {
    Handler(HandlerError),
    Panic(String),
    WrongType(String),
}

impl Failure {
    /// Converts to the run's taxonomy: stage-level without an item, item-level with one.
    fn into_error(self, descriptor: &StageDescriptor, item: Option<&str>) -> ScrapeflowError {
        let stage = descriptor.name().to_string();
        let expected = descriptor.output_type().short_name().to_string();

        let err = match self {
            Self::WrongType(found) => ScrapeflowError::TypeMismatch {
                stage: stage.clone(),
                expected,
                found,
            },
            Self::Handler(HandlerError::Output(e)) => ScrapeflowError::TypeMismatch {
                stage: stage.clone(),
                expected,
                found: e.to_string(),
            },
            Self::Handler(HandlerError::Failed(e)) => ScrapeflowError::StageFailed {
                stage: stage.clone(),
                message: format!("{e:#}"),
            },
            Self::Handler(other) => ScrapeflowError::StageFailed {
                stage: stage.clone(),
                message: other.to_string(),
            },
            Self::Panic(message) => ScrapeflowError::StageFailed {
                stage: stage.clone(),
                message: format!("handler panicked: {message}"),
            },
        };

        match item {
            None => err,
            Some(item) => ScrapeflowError::ItemProcessing {
                stage,
                item: item.to_string(),
                message: match err {
                    ScrapeflowError::StageFailed { message, .. } => message,
                    other => other.to_string(),
                },
            },
        }
    }
}

/// Invokes the handler once, isolating panics and checking the output type.
async fn invoke(
    descriptor: &StageDescriptor,
    ctx: StageContext,
    input: Option<Record>,
) -> Result<DocumentBatch, Failure> {
    let batch = AssertUnwindSafe(descriptor.handler().invoke(ctx, input))
        .catch_unwind()
        .await
        .map_err(|panic| Failure::Panic(panic_message(&*panic)))?
        .map_err(Failure::Handler)?;

    if batch.doc_type() == descriptor.output_type() {
        Ok(batch)
    } else {
        Err(Failure::WrongType(batch.doc_type().short_name().to_string()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
