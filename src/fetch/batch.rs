use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use super::{BasicClient, FetchResult, HttpClient, RequestDescriptor, Traced};
use crate::config::{ConfigError, FetchConfig};

/// Issues a batch of requests concurrently and returns one [`FetchResult`]
/// per request, in input order.
///
/// Individual failures never fail the batch: non-200 responses are returned
/// as they are, transport failures and timeouts become synthetic 504 results.
/// Nothing is retried here; retries happen at chunk granularity.
#[derive(Debug, Clone, Default)]
pub struct BatchFetcher {
    config: FetchConfig,
}

impl BatchFetcher {
    /// # Errors
    ///
    /// Returns the [`ConfigError`] found in `config`; nothing is fetched with
    /// an invalid configuration.
    pub fn new(config: FetchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Runs the batch over a fresh connection pool that is dropped when the
    /// call returns.
    ///
    /// # Errors
    ///
    /// Only fails if the HTTP client cannot be built.
    pub async fn fetch_all(&self, requests: &[RequestDescriptor]) -> Result<Vec<FetchResult>> {
        let client = Traced::new(BasicClient::new(&self.config).context("building HTTP client")?);
        Ok(self.fetch_all_with(&client, requests).await)
    }

    /// Runs the batch over a caller-supplied client.
    pub async fn fetch_all_with<C: HttpClient>(
        &self,
        client: &C,
        requests: &[RequestDescriptor],
    ) -> Vec<FetchResult> {
        let deadline = self.config.batch_deadline.map(|d| Instant::now() + d);
        info!(
            requests = requests.len(),
            max_in_flight = self.config.max_in_flight,
            "Start downloading"
        );

        let results: Vec<FetchResult> = stream::iter(requests)
            .map(|req| self.fetch_one(client, req, deadline))
            .buffered(self.config.max_in_flight.max(1))
            .collect()
            .await;

        info!(results = results.len(), "Done downloading");
        results
    }

    async fn fetch_one<C: HttpClient>(
        &self,
        client: &C,
        source: &RequestDescriptor,
        deadline: Option<Instant>,
    ) -> FetchResult {
        let own_deadline = Instant::now() + self.config.timeout;
        let until = deadline.map_or(own_deadline, |d| d.min(own_deadline));

        let result = match timeout_at(until, execute(client, source)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!(url = source.url(), error = %e, "Request failed");
                FetchResult::transient(source.clone())
            }
            Err(_) => {
                warn!(url = source.url(), "Request timed out");
                FetchResult::transient(source.clone())
            }
        };

        if !result.succeeded && !result.is_transient_failure() {
            warn!(url = source.url(), status = result.status, "Unexpected http status");
        }

        if self.config.jitter_probability > 0.0 && rand::random_bool(self.config.jitter_probability)
        {
            debug!(pause_ms = self.config.jitter_pause.as_millis() as u64, "Backing off");
            sleep(self.config.jitter_pause).await;
        }

        result
    }
}

async fn execute<C: HttpClient>(client: &C, source: &RequestDescriptor) -> Result<FetchResult> {
    let url = reqwest::Url::parse(source.url())
        .with_context(|| format!("invalid url '{}'", source.url()))?;
    let req = reqwest::Request::new(source.kind().method(), url);

    let resp = client.execute(req).await?;
    let status = resp.status().as_u16();
    let body = resp.bytes().await?;

    Ok(FetchResult::from_response(source.clone(), status, body))
}
