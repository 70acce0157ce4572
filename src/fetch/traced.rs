use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use std::time::Instant;
use tracing::{Instrument, debug};

/// An [`HttpClient`] wrapper that records a span per request and logs its
/// method, url, status and duration.
pub struct Traced<C> {
    pub inner: C,
}

impl<C> Traced<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for Traced<C> {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let span = tracing::debug_span!("http", method = %req.method(), url = %req.url());
        async move {
            let start = Instant::now();
            debug!("Request started");
            let result = self.inner.execute(req).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;
            match &result {
                Ok(resp) => debug!(status = resp.status().as_u16(), elapsed_ms, "Request finished"),
                Err(e) => debug!(error = %e, elapsed_ms, "Request failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
