//! CLI entry point for the ViaggiaTreno harvester.
//!
//! Provides one subcommand per pipeline: the station list, train-number
//! discovery, and the trip status sweep that produces delay records.

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use viaggiatreno_harvester::{
    chunk::ChunkReport,
    config::{ChunkConfig, DEFAULT_BASE_URL, DEFAULT_TIMEZONE, FetchConfig, HarvestConfig},
    observe::init_tracing,
    pipeline::Harvester,
};

#[derive(Parser)]
#[command(name = "viaggiatreno_harvester")]
#[command(about = "Harvest live train movements from ViaggiaTreno", long_about = None)]
struct Cli {
    #[command(flatten)]
    harvest: HarvestArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct HarvestArgs {
    /// Base URL of the ViaggiaTreno REST API
    #[arg(long, env = "VIAGGIATRENO_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory for output files
    #[arg(short = 'd', long, default_value = "data")]
    data_dir: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 180)]
    timeout_secs: u64,

    /// Maximum number of requests in flight per batch
    #[arg(long, env = "HARVEST_MAX_IN_FLIGHT", default_value_t = 100)]
    max_in_flight: usize,

    /// Probability of a short pause after each fetch
    #[arg(long, env = "HARVEST_JITTER_PROBABILITY", default_value_t = 0.1)]
    jitter_probability: f64,

    /// Optional deadline for a whole batch, in seconds
    #[arg(long)]
    batch_deadline_secs: Option<u64>,

    /// Time zone the upstream timestamps are derived from
    #[arg(long, default_value = DEFAULT_TIMEZONE)]
    timezone: String,
}

#[derive(Args)]
struct ChunkArgs {
    /// Number of requests per chunk
    #[arg(short = 'c', long)]
    chunk_size: Option<u64>,

    /// Lower bound of the random pause before each chunk, in seconds
    #[arg(long, default_value_t = 0.0)]
    min_delay_secs: f64,

    /// Upper bound of the random pause before each chunk, in seconds
    #[arg(long)]
    max_delay_secs: Option<f64>,

    /// Pause after a failed chunk, in seconds
    #[arg(long, default_value_t = 10)]
    cooldown_secs: u64,
}

impl ChunkArgs {
    fn into_config(self, chunk_size: u64, max_delay_secs: f64) -> Result<ChunkConfig> {
        Ok(ChunkConfig {
            chunk_size: self.chunk_size.unwrap_or(chunk_size),
            min_delay: Duration::try_from_secs_f64(self.min_delay_secs)?,
            max_delay: Duration::try_from_secs_f64(self.max_delay_secs.unwrap_or(max_delay_secs))?,
            cooldown: Duration::from_secs(self.cooldown_secs),
        })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the station list with region codes
    Stations,
    /// Resolve candidate train numbers to their starting stations
    TrainNumbers {
        /// First train number to try
        #[arg(long, default_value_t = 0)]
        start: u64,

        /// Train number to stop before
        #[arg(long, default_value_t = 100_000)]
        end: u64,

        /// CSV file to write the matches to
        #[arg(short, long, default_value = "data/starting_stations.csv")]
        output: PathBuf,

        #[command(flatten)]
        chunk: ChunkArgs,
    },
    /// Fetch the live status of every discovered train and write delay records
    TrainStatus {
        /// CSV produced by `train-numbers`
        #[arg(short, long, default_value = "data/starting_stations.csv")]
        input: PathBuf,

        #[command(flatten)]
        chunk: ChunkArgs,
    },
}

impl HarvestArgs {
    fn into_config(self, chunk: ChunkConfig) -> HarvestConfig {
        HarvestConfig {
            base_url: self.base_url,
            timezone: self.timezone,
            data_dir: self.data_dir,
            fetch: FetchConfig {
                timeout: Duration::from_secs(self.timeout_secs),
                max_in_flight: self.max_in_flight,
                jitter_probability: self.jitter_probability,
                batch_deadline: self.batch_deadline_secs.map(Duration::from_secs),
                ..Default::default()
            },
            chunk,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let cli = Cli::parse();

    let _log_guard = init_tracing()?;

    match cli.command {
        Commands::Stations => {
            let harvester = Harvester::new(cli.harvest.into_config(ChunkConfig::default()))?;
            let stations = harvester.harvest_stations().await?;
            info!(stations = stations.len(), "Done");
        }
        Commands::TrainNumbers {
            start,
            end,
            output,
            chunk,
        } => {
            let harvester = Harvester::new(cli.harvest.into_config(chunk.into_config(500, 3.0)?))?;
            let report = harvester.discover_train_numbers(start..end, &output).await?;
            report_gaps(&report);
        }
        Commands::TrainStatus { input, chunk } => {
            let harvester = Harvester::new(cli.harvest.into_config(chunk.into_config(100, 0.0)?))?;
            let tz = harvester.config.parsed_timezone()?;
            let today = Utc::now().with_timezone(&tz).date_naive();
            let report = harvester.harvest_train_status(&input, today).await?;
            report_gaps(&report);
        }
    }

    Ok(())
}

/// Skipped chunks are not retried; list them so the sweep can be re-run.
fn report_gaps(report: &ChunkReport) {
    if report.is_complete() {
        info!(chunks = report.chunks, "All chunks processed");
        return;
    }
    for range in &report.failed {
        warn!(from = range.start, to = range.end, "Chunk skipped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_exits_during_parsing() {
        let err = Cli::try_parse_from(["viaggiatreno_harvester", "--help"])
            .err()
            .unwrap();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_delay_window_flags() {
        let cli = Cli::try_parse_from([
            "viaggiatreno_harvester",
            "train-numbers",
            "--min-delay-secs",
            "1.5",
            "--max-delay-secs",
            "2",
        ])
        .unwrap();
        let Commands::TrainNumbers { chunk, .. } = cli.command else {
            panic!("expected train-numbers");
        };

        let config = chunk.into_config(500, 3.0).unwrap();

        assert_eq!(config.min_delay, Duration::from_millis(1500));
        assert_eq!(config.max_delay, Duration::from_secs(2));
        assert_eq!(config.chunk_size, 500);
    }
}
