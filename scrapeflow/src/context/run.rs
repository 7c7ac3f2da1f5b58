//! Run-wide collaborators.

use super::StageContext;
use crate::browser::Driver;
use crate::config::{ConfigError, ScraperConfig};
use crate::interceptor::Interceptor;
use std::sync::Arc;
use uuid::Uuid;

/// What a run needs besides the registry: the shared driver, an optional
/// interceptor and the validated configuration.
#[derive(Clone)]
pub struct RunContext {
    driver: Arc<dyn Driver>,
    interceptor: Option<Arc<dyn Interceptor>>,
    config: Arc<ScraperConfig>,
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("interceptor", &self.interceptor.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    /// Creates a context over `driver` with the default configuration.
    #[must_use]
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self {
            driver,
            interceptor: None,
            config: Arc::new(ScraperConfig::default()),
        }
    }

    /// Attaches an interceptor.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    /// Replaces the configuration after validating it.
    ///
    /// # Errors
    ///
    /// Returns the configuration's validation error.
    pub fn with_config(mut self, config: ScraperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = Arc::new(config);
        Ok(self)
    }

    /// The shared driver.
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn Driver> {
        &self.driver
    }

    /// The interceptor, if one is attached.
    #[must_use]
    pub fn interceptor(&self) -> Option<&Arc<dyn Interceptor>> {
        self.interceptor.as_ref()
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<ScraperConfig> {
        &self.config
    }

    /// The handler view for one run of `stage`.
    #[must_use]
    pub fn stage_context(&self, stage: &str, run_id: Uuid) -> StageContext {
        StageContext::new(
            stage,
            run_id,
            Arc::clone(&self.driver),
            self.interceptor.clone(),
            Arc::clone(&self.config),
        )
    }
}
