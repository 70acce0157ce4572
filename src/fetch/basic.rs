use super::client::HttpClient;
use crate::config::FetchConfig;
use async_trait::async_trait;
use reqwest::redirect::Policy;

/// Plain reqwest client with a connection pool. Redirects are never
/// followed so 3xx responses reach the caller untouched.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(config: &FetchConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
