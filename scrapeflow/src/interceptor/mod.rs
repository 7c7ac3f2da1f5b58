//! Network request interception.
//!
//! An [`Interceptor`] is started before a run acquires the driver and stopped
//! during cleanup. Handlers query captured traffic through [`InterceptorExt`].

mod capture_log;
mod request;

pub use capture_log::{CaptureFileInterceptor, CaptureLog};
pub use request::{CapturedRequest, CapturedResponse, HttpStatusError};

use async_trait::async_trait;
use std::collections::HashMap;

/// Captures the browser's network traffic.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Begins capturing.
    async fn start(&self) -> anyhow::Result<()>;

    /// Stops capturing and releases its resources.
    async fn stop(&self) -> anyhow::Result<()>;

    /// Every request captured so far, oldest first.
    async fn requests(&self) -> anyhow::Result<Vec<CapturedRequest>>;
}

/// Queries over captured traffic.
#[async_trait]
pub trait InterceptorExt: Interceptor {
    /// Captured requests satisfying `predicate`.
    async fn requests_matching<P>(&self, predicate: P) -> anyhow::Result<Vec<CapturedRequest>>
    where
        P: Fn(&CapturedRequest) -> bool + Send + Sync,
    {
        let mut requests = self.requests().await?;
        requests.retain(|request| predicate(request));
        Ok(requests)
    }

    /// The first captured request satisfying `predicate`.
    async fn find_first<P>(&self, predicate: P) -> anyhow::Result<Option<CapturedRequest>>
    where
        P: Fn(&CapturedRequest) -> bool + Send + Sync,
    {
        Ok(self.requests().await?.into_iter().find(|request| predicate(request)))
    }

    /// Request counts per HTTP method.
    async fn count_by_method(&self) -> anyhow::Result<HashMap<String, usize>> {
        let mut counts = HashMap::new();
        for request in self.requests().await? {
            *counts.entry(request.method).or_insert(0) += 1;
        }
        Ok(counts)
    }

    /// Request counts per response status code.
    async fn count_by_status_code(&self) -> anyhow::Result<HashMap<u16, usize>> {
        let mut counts = HashMap::new();
        for request in self.requests().await? {
            *counts.entry(request.response.status_code).or_insert(0) += 1;
        }
        Ok(counts)
    }
}

impl<T: Interceptor + ?Sized> InterceptorExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockInterceptor;

    fn traffic() -> MockInterceptor {
        MockInterceptor::with_requests(vec![
            CapturedRequest::new("GET", "https://a/api/cities")
                .with_response(CapturedResponse::new("https://a/api/cities", 200)),
            CapturedRequest::new("GET", "https://a/logo.png")
                .with_response(CapturedResponse::new("https://a/logo.png", 404)),
            CapturedRequest::new("POST", "https://a/api/search")
                .with_response(CapturedResponse::new("https://a/api/search", 200)),
        ])
    }

    #[tokio::test]
    async fn test_requests_matching() {
        let interceptor = traffic();
        let api = interceptor
            .requests_matching(|r| r.url.contains("/api/"))
            .await
            .unwrap();
        assert_eq!(api.len(), 2);
    }

    #[tokio::test]
    async fn test_find_first() {
        let interceptor = traffic();
        let post = interceptor.find_first(|r| r.method == "POST").await.unwrap();
        assert_eq!(post.unwrap().url, "https://a/api/search");

        let none = interceptor.find_first(|r| r.method == "DELETE").await.unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_counts() {
        let interceptor = traffic();

        let by_method = interceptor.count_by_method().await.unwrap();
        assert_eq!(by_method["GET"], 2);
        assert_eq!(by_method["POST"], 1);

        let by_status = interceptor.count_by_status_code().await.unwrap();
        assert_eq!(by_status[&200], 2);
        assert_eq!(by_status[&404], 1);
    }

    #[tokio::test]
    async fn test_ext_on_trait_object() {
        let interceptor: std::sync::Arc<dyn Interceptor> = std::sync::Arc::new(traffic());
        let found = interceptor.find_first(|r| r.url.ends_with(".png")).await.unwrap();
        assert!(found.is_some());
    }
}
