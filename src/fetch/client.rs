use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes one HTTP request. Wrappers such as [`Traced`](super::Traced)
/// compose around an inner client.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
