//! Run selection.

use serde::{Deserialize, Serialize};

/// Which stage to run, optionally against a single URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRequest {
    /// Stage name.
    pub stage: String,
    /// Single-URL override: the stage processes `{"link": url}` only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl RunRequest {
    /// Runs `stage` on its normal input.
    #[must_use]
    pub fn new(stage: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            url: None,
        }
    }

    /// Runs `stage` on one URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json() {
        let request: RunRequest =
            serde_json::from_str(r#"{"stage": "details", "url": "https://a"}"#).unwrap();
        assert_eq!(request, RunRequest::new("details").with_url("https://a"));

        let json = serde_json::to_string(&RunRequest::new("cities")).unwrap();
        assert_eq!(json, r#"{"stage":"cities"}"#);
    }
}
