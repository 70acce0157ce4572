//! Orchestrators that turn "endpoints to poll" into records on disk.
//!
//! Each pipeline builds request descriptors, runs them through the
//! [`BatchFetcher`] (through the [`ChunkDriver`] for long sweeps), parses the
//! bodies and hands the records to the [`output`](crate::output) writer.

pub mod stations;
pub mod train_numbers;
pub mod train_status;

use tracing::info;

use crate::chunk::ChunkDriver;
use crate::config::{ConfigError, HarvestConfig};
use crate::endpoints::Endpoints;
use crate::fetch::{BatchFetcher, FetchResult};
use crate::parser::TripParser;
use crate::records::BatchStats;

/// Everything a pipeline needs, validated up front.
#[derive(Debug, Clone)]
pub struct Harvester {
    pub config: HarvestConfig,
    pub endpoints: Endpoints,
    pub fetcher: BatchFetcher,
    pub driver: ChunkDriver,
    pub parser: TripParser,
}

impl Harvester {
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found in `config`.
    pub fn new(config: HarvestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            endpoints: Endpoints::new(&config.base_url),
            fetcher: BatchFetcher::new(config.fetch.clone())?,
            driver: ChunkDriver::new(config.chunk.clone())?,
            parser: TripParser::new(config.parsed_timezone()?),
            config,
        })
    }
}

/// Results worth parsing: a 200 with a non-empty body. An empty body means
/// "no data" upstream, not an error.
pub fn usable(results: &[FetchResult]) -> impl Iterator<Item = &FetchResult> {
    results.iter().filter(|r| r.succeeded && !r.is_empty())
}

pub(crate) fn log_batch(label: &'static str, results: &[FetchResult]) -> BatchStats {
    let stats = BatchStats::from_results(results);
    info!(
        batch = label,
        total = stats.total,
        succeeded = stats.succeeded,
        empty = stats.empty,
        non_200 = stats.non_200,
        transient = stats.transient,
        success_pct = stats.success_pct(),
        "Batch fetched"
    );
    stats
}
