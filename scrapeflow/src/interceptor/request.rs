//! Captured request and response model.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

const REDIRECT_CODES: [u16; 5] = [301, 302, 303, 307, 308];

/// A non-success status surfaced by [`CapturedResponse::error_for_status`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("HTTP Error: Status code {status_code} for URL {url}")]
pub struct HttpStatusError {
    /// The response status.
    pub status_code: u16,
    /// The response URL.
    pub url: String,
}

fn header_lookup<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Status codes the proxy could not record ("No Response") read as 0.
fn lenient_status<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .unwrap_or(0))
}

/// A response observed by the interceptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedResponse {
    /// Response URL.
    #[serde(default)]
    pub url: String,
    /// HTTP status, 0 when none was received.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status_code: u16,
    /// Response headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Response body as text.
    #[serde(default)]
    pub body: Option<String>,
}

impl CapturedResponse {
    /// Creates a response with no headers and no body.
    #[must_use]
    pub fn new(url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            status_code,
            ..Self::default()
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The body, empty if none was captured.
    #[must_use]
    pub fn text(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }

    /// Parses the body as JSON; `None` if it is not valid JSON.
    #[must_use]
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_str(self.text()).ok()
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Status in `200..400`.
    #[must_use]
    pub fn ok(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Status is 301, 302, 303, 307 or 308.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        REDIRECT_CODES.contains(&self.status_code)
    }

    /// The `charset` of the `Content-Type` header, else `utf-8`.
    #[must_use]
    pub fn encoding(&self) -> &str {
        self.get_header("Content-Type")
            .and_then(|content_type| content_type.rsplit_once("charset="))
            .map_or("utf-8", |(_, charset)| charset.trim())
    }

    /// Returns `self` if [`ok`](Self::ok), else the status as an error.
    ///
    /// # Errors
    ///
    /// Returns [`HttpStatusError`] for statuses outside `200..400`.
    pub fn error_for_status(&self) -> Result<&Self, HttpStatusError> {
        if self.ok() {
            Ok(self)
        } else {
            Err(HttpStatusError {
                status_code: self.status_code,
                url: self.url.clone(),
            })
        }
    }
}

impl fmt::Display for CapturedResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Response [{}] url=\"{}\">", self.status_code, self.url)
    }
}

/// A request observed by the interceptor, with its response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedRequest {
    /// HTTP method.
    #[serde(default)]
    pub method: String,
    /// Request URL.
    #[serde(default)]
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Request body.
    #[serde(default)]
    pub body: Option<String>,
    /// The matching response.
    #[serde(default)]
    pub response: CapturedResponse,
}

impl CapturedRequest {
    /// Creates a request with an empty response.
    #[must_use]
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Attaches the response.
    #[must_use]
    pub fn with_response(mut self, response: CapturedResponse) -> Self {
        self.response = response;
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        header_lookup(&self.headers, name)
    }

    /// Returns true if the body is present and non-empty.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.as_deref().is_some_and(|body| !body.is_empty())
    }
}

impl fmt::Display for CapturedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Request [{}] url=\"{}\">", self.method, self.url)
    }
}
