//! JSON-lines capture files written by the intercepting proxy.

use super::{CapturedRequest, CapturedResponse, Interceptor};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct CaptureLine {
    request: CapturedRequest,
    #[serde(default)]
    response: Option<CapturedResponse>,
}

/// Reader for capture files: one `{"request": .., "response": ..}` per line.
pub struct CaptureLog;

impl CaptureLog {
    /// Parses capture content. Blank and malformed lines are skipped.
    #[must_use]
    pub fn parse(content: &str) -> Vec<CapturedRequest> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<CaptureLine>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping malformed capture line");
                    None
                }
            })
            .map(|entry| {
                let mut request = entry.request;
                if let Some(mut response) = entry.response {
                    if response.url.is_empty() {
                        response.url.clone_from(&request.url);
                    }
                    request.response = response;
                }
                request
            })
            .collect()
    }

    /// Reads the capture file at `path`. A missing file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub async fn read(path: &Path) -> std::io::Result<Vec<CapturedRequest>> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Self::parse(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Default capture file for a scraper: `<tmp>/__<name>_requests.json`.
    #[must_use]
    pub fn default_path(scraper_name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("__{}_requests.json", scraper_name.to_lowercase()))
    }
}

/// An interceptor backed by a capture file some external proxy appends to.
///
/// `start` truncates the file so each run sees only its own traffic.
#[derive(Debug, Clone)]
pub struct CaptureFileInterceptor {
    path: PathBuf,
}

impl CaptureFileInterceptor {
    /// Interceptor over the capture file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The capture file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Interceptor for CaptureFileInterceptor {
    async fn start(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, b"").await?;
        tracing::debug!(path = %self.path.display(), "Capture file reset");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn requests(&self) -> anyhow::Result<Vec<CapturedRequest>> {
        Ok(CaptureLog::read(&self.path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = r#"{"request": {"method": "GET", "url": "https://a/api", "headers": {"Accept": "application/json"}}, "response": {"status_code": 200, "body": "{\"ok\": true}"}}

not json at all
{"request": {"method": "POST", "url": "https://a/login", "body": "u=1"}, "response": {"url": "https://a/home", "status_code": 302}}
{"missing": "request"}
"#;

    #[test]
    fn test_parse_skips_malformed_lines() {
        let requests = CaptureLog::parse(CAPTURE);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].response.url, "https://a/api");
        assert_eq!(requests[0].response.json().unwrap()["ok"], true);
        assert_eq!(requests[1].response.url, "https://a/home");
        assert!(requests[1].response.is_redirect());
        assert!(requests[1].has_body());
    }

    #[tokio::test]
    async fn test_read_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let requests = CaptureLog::read(&dir.path().join("none.json")).await.unwrap();
        assert!(requests.is_empty());
    }

    #[tokio::test]
    async fn test_file_interceptor_start_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.json");
        tokio::fs::write(&path, CAPTURE).await.unwrap();

        let interceptor = CaptureFileInterceptor::new(&path);
        assert_eq!(interceptor.requests().await.unwrap().len(), 2);

        interceptor.start().await.unwrap();
        assert!(interceptor.requests().await.unwrap().is_empty());
        interceptor.stop().await.unwrap();
    }

    #[test]
    fn test_default_path() {
        let path = CaptureLog::default_path("CityScraper");
        assert!(path.ends_with("__cityscraper_requests.json"));
    }
}
