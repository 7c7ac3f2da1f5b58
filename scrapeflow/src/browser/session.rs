//! The one driver session a run holds.

use super::Driver;
use crate::config::ScraperConfig;
use crate::errors::ScrapeflowError;
use std::sync::Arc;

/// Opens the driver on acquire and closes it exactly once on release.
pub struct DriverSession {
    driver: Arc<dyn Driver>,
    opened_here: bool,
    released: bool,
}

impl std::fmt::Debug for DriverSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverSession")
            .field("opened_here", &self.opened_here)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl DriverSession {
    /// Opens `driver` unless it is already open.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeflowError::Resource`] if the browser fails to start.
    pub async fn acquire(
        driver: Arc<dyn Driver>,
        config: &ScraperConfig,
    ) -> Result<Self, ScrapeflowError> {
        let opened_here = if driver.is_open() {
            false
        } else {
            driver
                .open(config)
                .await
                .map_err(|e| ScrapeflowError::resource(format!("failed to open driver: {e:#}")))?;
            tracing::debug!(headless = config.headless, "Driver opened");
            true
        };

        Ok(Self {
            driver,
            opened_here,
            released: false,
        })
    }

    /// The shared driver handle.
    #[must_use]
    pub fn driver(&self) -> Arc<dyn Driver> {
        Arc::clone(&self.driver)
    }

    /// Returns true if this session launched the browser.
    #[must_use]
    pub fn opened_here(&self) -> bool {
        self.opened_here
    }

    /// Closes the driver. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns the driver's close error.
    pub async fn release(&mut self) -> anyhow::Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.driver.close().await?;
        tracing::debug!("Driver closed");
        Ok(())
    }
}
