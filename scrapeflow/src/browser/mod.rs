//! Browser driver interface.
//!
//! Stages reach the browser only through the [`Driver`] trait carried on their
//! [`StageContext`](crate::context::StageContext). The executor owns exactly
//! one [`DriverSession`] per run and closes it during cleanup.

mod session;

pub use session::DriverSession;

use crate::config::ScraperConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Standard element wait timeouts.
pub mod wait {
    use std::time::Duration;

    /// Short wait.
    pub const SHORT: Duration = Duration::from_secs(4);
    /// Long wait.
    pub const LONG: Duration = Duration::from_secs(8);
    /// Very long wait.
    pub const VERY_LONG: Duration = Duration::from_secs(16);
}

/// How an element is located.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "query", rename_all = "snake_case")]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// XPath expression.
    #[serde(rename = "xpath")]
    XPath(String),
}

impl Locator {
    /// CSS selector locator.
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// XPath locator.
    #[must_use]
    pub fn xpath(expression: impl Into<String>) -> Self {
        Self::XPath(expression.into())
    }

    /// The raw query string.
    #[must_use]
    pub fn query(&self) -> &str {
        match self {
            Self::Css(q) | Self::XPath(q) => q,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(q) => write!(f, "css={q}"),
            Self::XPath(q) => write!(f, "xpath={q}"),
        }
    }
}

/// A snapshot of a page element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    /// Tag name, lowercase.
    pub tag: String,
    /// Visible text.
    pub text: String,
    /// Attributes by name.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl Element {
    /// Creates an element with no attributes.
    #[must_use]
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            text: text.into(),
            attributes: HashMap::new(),
        }
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Looks up an attribute.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `href` attribute.
    #[must_use]
    pub fn link(&self) -> Option<&str> {
        self.attribute("href")
    }
}

/// A browser cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path scope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl Cookie {
    /// Creates a cookie without scope.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }
}

/// Where to scroll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrollTarget {
    /// Page top.
    Top,
    /// Page bottom.
    Bottom,
    /// Down by a pixel amount.
    By(i64),
    /// Into view of an element.
    Element(Locator),
}

/// Browser automation driver.
///
/// Navigation and lookup methods return `anyhow` errors so that
/// implementations can surface their own failure types.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Launches the browser with `config`.
    async fn open(&self, config: &ScraperConfig) -> anyhow::Result<()>;

    /// Shuts the browser down. Closing a closed driver is a no-op.
    async fn close(&self) -> anyhow::Result<()>;

    /// Returns true while the browser is running.
    fn is_open(&self) -> bool;

    /// Loads `url`.
    async fn navigate(&self, url: &str) -> anyhow::Result<()>;

    /// The URL of the current page.
    async fn current_url(&self) -> anyhow::Result<String>;

    /// First element matching `locator`, waiting up to `timeout`.
    async fn find_element(
        &self,
        locator: &Locator,
        timeout: Duration,
    ) -> anyhow::Result<Option<Element>>;

    /// All elements matching `locator`, waiting up to `timeout` for the first.
    async fn find_elements(&self, locator: &Locator, timeout: Duration)
        -> anyhow::Result<Vec<Element>>;

    /// Clicks the first match. Returns false if nothing matched.
    async fn click(&self, locator: &Locator, timeout: Duration) -> anyhow::Result<bool>;

    /// Scrolls the page.
    async fn scroll(&self, target: ScrollTarget) -> anyhow::Result<()>;

    /// Cookies of the current page.
    async fn cookies(&self) -> anyhow::Result<Vec<Cookie>>;

    /// Adds cookies.
    async fn set_cookies(&self, cookies: &[Cookie]) -> anyhow::Result<()>;

    /// Removes every cookie.
    async fn clear_cookies(&self) -> anyhow::Result<()>;

    /// Local storage of the current origin.
    async fn local_storage(&self) -> anyhow::Result<HashMap<String, String>>;

    /// Writes local storage entries.
    async fn set_local_storage(&self, entries: &HashMap<String, String>) -> anyhow::Result<()>;

    /// Empties local storage.
    async fn clear_local_storage(&self) -> anyhow::Result<()>;

    /// Evaluates a script in the page and returns its JSON result.
    async fn run_script(&self, script: &str) -> anyhow::Result<serde_json::Value>;
}
