//! The handler's view of a run.

use crate::browser::Driver;
use crate::config::ScraperConfig;
use crate::interceptor::{CapturedRequest, Interceptor};
use std::sync::Arc;
use uuid::Uuid;

/// Passed by value to every handler invocation. Cloning is cheap.
#[derive(Clone)]
pub struct StageContext {
    stage: Arc<str>,
    run_id: Uuid,
    driver: Arc<dyn Driver>,
    interceptor: Option<Arc<dyn Interceptor>>,
    config: Arc<ScraperConfig>,
}

impl std::fmt::Debug for StageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageContext")
            .field("stage", &self.stage)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

impl StageContext {
    /// Creates a stage context.
    #[must_use]
    pub fn new(
        stage: &str,
        run_id: Uuid,
        driver: Arc<dyn Driver>,
        interceptor: Option<Arc<dyn Interceptor>>,
        config: Arc<ScraperConfig>,
    ) -> Self {
        Self {
            stage: Arc::from(stage),
            run_id,
            driver,
            interceptor,
            config,
        }
    }

    /// The stage being run.
    #[must_use]
    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// The run id.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The browser driver.
    #[must_use]
    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// The interceptor, if the run has one.
    #[must_use]
    pub fn interceptor(&self) -> Option<&dyn Interceptor> {
        self.interceptor.as_deref()
    }

    /// The scraper configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<ScraperConfig> {
        &self.config
    }

    /// Captured traffic; empty when no interceptor is attached.
    ///
    /// # Errors
    ///
    /// Returns the interceptor's read error.
    pub async fn captured_requests(&self) -> anyhow::Result<Vec<CapturedRequest>> {
        match &self.interceptor {
            Some(interceptor) => interceptor.requests().await,
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interceptor::CapturedRequest;
    use crate::testing::{MockDriver, MockInterceptor};

    fn context(interceptor: Option<Arc<dyn Interceptor>>) -> StageContext {
        StageContext::new(
            "listing",
            Uuid::new_v4(),
            Arc::new(MockDriver::new()),
            interceptor,
            Arc::new(ScraperConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_driver_access() {
        let driver = Arc::new(MockDriver::new());
        driver.open(&ScraperConfig::default()).await.unwrap();
        let ctx = StageContext::new(
            "listing",
            Uuid::new_v4(),
            Arc::clone(&driver) as Arc<dyn Driver>,
            None,
            Arc::new(ScraperConfig::default()),
        );

        ctx.driver().navigate("https://a").await.unwrap();
        assert_eq!(ctx.driver().current_url().await.unwrap(), "https://a");
        assert_eq!(driver.navigations(), vec!["https://a".to_string()]);
    }

    #[tokio::test]
    async fn test_driver_access_requires_open_driver() {
        let ctx = context(None);
        assert!(ctx.driver().navigate("https://a").await.is_err());
    }

    #[tokio::test]
    async fn test_captured_requests_without_interceptor() {
        assert!(context(None).captured_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_captured_requests_with_interceptor() {
        let interceptor = MockInterceptor::with_requests(vec![CapturedRequest::new("GET", "https://a")]);
        let ctx = context(Some(Arc::new(interceptor)));

        assert_eq!(ctx.captured_requests().await.unwrap().len(), 1);
    }
}
