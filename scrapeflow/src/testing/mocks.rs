//! Mock collaborators for testing stages.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use crate::browser::{Cookie, Driver, Element, Locator, ScrollTarget};
use crate::config::ScraperConfig;
use crate::interceptor::{CapturedRequest, Interceptor};

#[derive(Debug, Default)]
struct DriverState {
    open: bool,
    open_count: usize,
    close_count: usize,
    navigations: Vec<String>,
    current_url: Option<String>,
    pages: HashMap<(String, Locator), Vec<Element>>,
    cookies: Vec<Cookie>,
    storage: HashMap<String, String>,
    scripts: Vec<String>,
}

/// An in-process driver that serves canned pages.
///
/// Elements are registered per page URL and locator with
/// [`with_elements`](Self::with_elements); lookups use the last navigated URL.
#[derive(Debug, Default)]
pub struct MockDriver {
    state: Mutex<DriverState>,
    open_error: Option<String>,
}

impl MockDriver {
    /// Creates a driver that opens successfully.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver whose `open` fails with `message`.
    #[must_use]
    pub fn failing_open(message: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(DriverState::default()),
            open_error: Some(message.into()),
        }
    }

    /// Serves `elements` for `locator` on the page at `url`.
    #[must_use]
    pub fn with_elements(self, url: impl Into<String>, locator: Locator, elements: Vec<Element>) -> Self {
        self.state.lock().pages.insert((url.into(), locator), elements);
        self
    }

    /// Number of successful `open` calls.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.state.lock().open_count
    }

    /// Number of `close` calls on an open driver.
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Every URL navigated to, in order.
    #[must_use]
    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().navigations.clone()
    }

    /// Every script run, in order.
    #[must_use]
    pub fn scripts(&self) -> Vec<String> {
        self.state.lock().scripts.clone()
    }

    fn lookup(&self, locator: &Locator) -> Vec<Element> {
        let state = self.state.lock();
        let Some(url) = state.current_url.clone() else {
            return Vec::new();
        };
        state
            .pages
            .get(&(url, locator.clone()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Driver for MockDriver {
    async fn open(&self, _config: &ScraperConfig) -> anyhow::Result<()> {
        if let Some(message) = &self.open_error {
            anyhow::bail!("{message}");
        }
        let mut state = self.state.lock();
        state.open = true;
        state.open_count += 1;
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        if state.open {
            state.open = false;
            state.close_count += 1;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.lock().open
    }

    async fn navigate(&self, url: &str) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        anyhow::ensure!(state.open, "driver is not open");
        state.navigations.push(url.to_string());
        state.current_url = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> anyhow::Result<String> {
        Ok(self.state.lock().current_url.clone().unwrap_or_default())
    }

    async fn find_element(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> anyhow::Result<Option<Element>> {
        Ok(self.lookup(locator).into_iter().next())
    }

    async fn find_elements(
        &self,
        locator: &Locator,
        _timeout: Duration,
    ) -> anyhow::Result<Vec<Element>> {
        Ok(self.lookup(locator))
    }

    async fn click(&self, locator: &Locator, _timeout: Duration) -> anyhow::Result<bool> {
        Ok(!self.lookup(locator).is_empty())
    }

    async fn scroll(&self, _target: ScrollTarget) -> anyhow::Result<()> {
        Ok(())
    }

    async fn cookies(&self) -> anyhow::Result<Vec<Cookie>> {
        Ok(self.state.lock().cookies.clone())
    }

    async fn set_cookies(&self, cookies: &[Cookie]) -> anyhow::Result<()> {
        self.state.lock().cookies.extend_from_slice(cookies);
        Ok(())
    }

    async fn clear_cookies(&self) -> anyhow::Result<()> {
        self.state.lock().cookies.clear();
        Ok(())
    }

    async fn local_storage(&self) -> anyhow::Result<HashMap<String, String>> {
        Ok(self.state.lock().storage.clone())
    }

    async fn set_local_storage(&self, entries: &HashMap<String, String>) -> anyhow::Result<()> {
        self.state
            .lock()
            .storage
            .extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn clear_local_storage(&self) -> anyhow::Result<()> {
        self.state.lock().storage.clear();
        Ok(())
    }

    async fn run_script(&self, script: &str) -> anyhow::Result<serde_json::Value> {
        self.state.lock().scripts.push(script.to_string());
        Ok(serde_json::Value::Null)
    }
}

/// An interceptor that hands back a fixed list of requests.
#[derive(Debug, Default)]
pub struct MockInterceptor {
    requests: Vec<CapturedRequest>,
    start_count: Mutex<usize>,
    stop_count: Mutex<usize>,
}

impl MockInterceptor {
    /// Creates an interceptor with no traffic.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an interceptor that reports `requests`.
    #[must_use]
    pub fn with_requests(requests: Vec<CapturedRequest>) -> Self {
        Self {
            requests,
            ..Self::default()
        }
    }

    /// Number of `start` calls.
    #[must_use]
    pub fn start_count(&self) -> usize {
        *self.start_count.lock()
    }

    /// Number of `stop` calls.
    #[must_use]
    pub fn stop_count(&self) -> usize {
        *self.stop_count.lock()
    }
}

#[async_trait]
impl Interceptor for MockInterceptor {
    async fn start(&self) -> anyhow::Result<()> {
        *self.start_count.lock() += 1;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        *self.stop_count.lock() += 1;
        Ok(())
    }

    async fn requests(&self) -> anyhow::Result<Vec<CapturedRequest>> {
        Ok(self.requests.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_driver_serves_pages() {
        let driver = MockDriver::new().with_elements(
            "https://a/cities",
            Locator::css("a.city"),
            vec![Element::new("a", "Oslo").with_attribute("href", "https://a/oslo")],
        );
        driver.open(&ScraperConfig::default()).await.unwrap();

        assert!(driver
            .find_elements(&Locator::css("a.city"), Duration::ZERO)
            .await
            .unwrap()
            .is_empty());

        driver.navigate("https://a/cities").await.unwrap();
        let found = driver
            .find_element(&Locator::css("a.city"), Duration::ZERO)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.link(), Some("https://a/oslo"));
        assert_eq!(driver.navigations(), vec!["https://a/cities".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_driver_requires_open() {
        let driver = MockDriver::new();
        assert!(driver.navigate("https://a").await.is_err());

        driver.open(&ScraperConfig::default()).await.unwrap();
        driver.close().await.unwrap();
        driver.close().await.unwrap();
        assert_eq!(driver.close_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_interceptor_counts() {
        let interceptor = MockInterceptor::with_requests(vec![CapturedRequest::new("GET", "https://a")]);
        interceptor.start().await.unwrap();
        interceptor.stop().await.unwrap();

        assert_eq!(interceptor.start_count(), 1);
        assert_eq!(interceptor.stop_count(), 1);
        assert_eq!(interceptor.requests().await.unwrap().len(), 1);
    }
}
