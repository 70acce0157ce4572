//! Tunable knobs for fetching, chunking and output.
//!
//! Every struct has a [`Default`] matching the values the harvesters have
//! historically run with. Call `validate()` before any I/O: a [`ConfigError`]
//! is the only failure that is allowed to abort a run.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str =
    "http://www.viaggiatreno.it/viaggiatrenonew/resteasy/viaggiatreno";

pub const DEFAULT_TIMEZONE: &str = "Europe/Rome";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("chunk size must be at least 1")]
    ZeroChunkSize,
    #[error("max in-flight requests must be at least 1")]
    ZeroInFlight,
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("jitter probability {0} is outside [0, 1]")]
    JitterProbability(f64),
    #[error("unknown time zone: {0}")]
    TimeZone(String),
    #[error("minimum chunk delay {min:?} exceeds maximum {max:?}")]
    InvertedDelay { min: Duration, max: Duration },
    #[error("range start {start} is after range end {end}")]
    InvertedRange { start: u64, end: u64 },
}

/// Settings for one [`BatchFetcher`](crate::fetch::BatchFetcher).
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Ceiling for a single request, headers and body included.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Maximum number of requests in flight within one batch.
    pub max_in_flight: usize,
    /// Probability of pausing after a completed fetch.
    pub jitter_probability: f64,
    /// Length of that pause.
    pub jitter_pause: Duration,
    /// Optional deadline for a whole `fetch_all` call.
    pub batch_deadline: Option<Duration>,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            connect_timeout: Duration::from_secs(10),
            max_in_flight: 100,
            jitter_probability: 0.1,
            jitter_pause: Duration::from_secs(1),
            batch_deadline: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::ZeroInFlight);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(0.0..=1.0).contains(&self.jitter_probability) {
            return Err(ConfigError::JitterProbability(self.jitter_probability));
        }
        Ok(())
    }
}

/// Settings for the [`ChunkDriver`](crate::chunk::ChunkDriver).
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub chunk_size: u64,
    /// The pause before each chunk is drawn from `[min_delay, max_delay)`.
    /// Both zero disables it.
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Pause after a failed chunk.
    pub cooldown: Duration,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 100,
            min_delay: Duration::ZERO,
            max_delay: Duration::from_secs(3),
            cooldown: Duration::from_secs(10),
        }
    }
}

impl ChunkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if self.min_delay > self.max_delay {
            return Err(ConfigError::InvertedDelay {
                min: self.min_delay,
                max: self.max_delay,
            });
        }
        Ok(())
    }
}

/// Settings shared by all pipelines.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    pub base_url: String,
    /// Zone the upstream derives its epoch values from.
    pub timezone: String,
    pub data_dir: PathBuf,
    pub fetch: FetchConfig,
    pub chunk: ChunkConfig,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            timezone: DEFAULT_TIMEZONE.into(),
            data_dir: PathBuf::from("data"),
            fetch: FetchConfig::default(),
            chunk: ChunkConfig::default(),
        }
    }
}

impl HarvestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.fetch.validate()?;
        self.chunk.validate()?;
        self.parsed_timezone()?;
        Ok(())
    }

    pub fn parsed_timezone(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::TimeZone(self.timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(HarvestConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let config = ChunkConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroChunkSize));
    }

    #[test]
    fn test_delay_window_must_be_ordered() {
        let config = ChunkConfig {
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(3),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvertedDelay {
                min: Duration::from_secs(4),
                max: Duration::from_secs(3),
            })
        );

        let fixed = ChunkConfig {
            min_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(3),
            ..Default::default()
        };
        assert!(fixed.validate().is_ok());
    }

    #[test]
    fn test_fetch_config_bounds() {
        let mut config = FetchConfig::default();
        config.max_in_flight = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroInFlight));

        let mut config = FetchConfig::default();
        config.jitter_probability = 1.5;
        assert_eq!(config.validate(), Err(ConfigError::JitterProbability(1.5)));

        let mut config = FetchConfig::default();
        config.timeout = Duration::ZERO;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let config = HarvestConfig {
            timezone: "Mars/Olympus".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::TimeZone(_))));
    }
}
