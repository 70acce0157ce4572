//! Sequential, rate-limited sweep over a large range.
//!
//! The range is cut into contiguous chunks that are processed one at a time
//! with a random pause in front of each. A chunk whose worker (or sink) fails
//! is logged, followed by a cooldown, and skipped: the sweep always runs to
//! the end and reports the skipped ranges so they can be re-run.

use std::future::Future;
use std::ops::Range;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::{ChunkConfig, ConfigError};

/// Splits `range` into contiguous, non-overlapping chunks of `size`. The
/// last chunk may be shorter. `size` must be at least 1.
pub fn chunks(range: Range<u64>, size: u64) -> impl Iterator<Item = Range<u64>> {
    let end = range.end;
    std::iter::successors(Some(range.start), move |&start| start.checked_add(size))
        .take_while(move |&start| start < end)
        .map(move |start| start..start.saturating_add(size).min(end))
}

/// Outcome of one [`ChunkDriver::run`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChunkReport {
    pub chunks: usize,
    pub succeeded: usize,
    /// Chunks that were skipped after a failure, in sweep order.
    pub failed: Vec<Range<u64>>,
}

impl ChunkReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChunkDriver {
    config: ChunkConfig,
}

impl ChunkDriver {
    /// # Errors
    ///
    /// Returns the [`ConfigError`] found in `config`, so a bad chunk size or
    /// delay window is rejected before any chunk runs.
    pub fn new(config: ChunkConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Runs `worker` on every chunk of `range` in order and hands each
    /// successful output to `sink`. Worker and sink failures are logged and
    /// recorded in the report, never returned.
    pub async fn run<T, W, Fut, S>(
        &self,
        range: Range<u64>,
        mut worker: W,
        mut sink: S,
    ) -> ChunkReport
    where
        W: FnMut(Range<u64>) -> Fut,
        Fut: Future<Output = Result<T>>,
        S: FnMut(Range<u64>, T) -> Result<()>,
    {
        let mut report = ChunkReport::default();
        for chunk in chunks(range, self.config.chunk_size) {
            report.chunks += 1;
            self.pause().await;

            info!(
                from = chunk.start,
                to = chunk.end,
                items = chunk.end - chunk.start,
                "Processing chunk"
            );

            let outcome = match worker(chunk.clone()).await {
                Ok(output) => sink(chunk.clone(), output),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    report.succeeded += 1;
                    debug!(from = chunk.start, to = chunk.end, "Chunk done");
                }
                Err(e) => {
                    warn!(
                        from = chunk.start,
                        to = chunk.end,
                        error = %e,
                        cooldown_secs = self.config.cooldown.as_secs_f64(),
                        "Chunk failed, skipping after cooldown"
                    );
                    report.failed.push(chunk);
                    sleep(self.config.cooldown).await;
                }
            }
        }

        info!(
            chunks = report.chunks,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            "Sweep finished"
        );
        report
    }

    async fn pause(&self) {
        let pause = pause_length(self.config.min_delay, self.config.max_delay);
        if !pause.is_zero() {
            debug!(pause_ms = pause.as_millis() as u64, "Pausing before chunk");
            sleep(pause).await;
        }
    }
}

/// Uniform draw from `[min, max)`; `min` when the window is empty.
fn pause_length(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    Duration::from_secs_f64(rand::random_range(min.as_secs_f64()..max.as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_driver(chunk_size: u64) -> ChunkDriver {
        ChunkDriver::new(ChunkConfig {
            chunk_size,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            cooldown: Duration::ZERO,
        })
        .unwrap()
    }

    #[test]
    fn test_chunks_cover_range_exactly_once() {
        for (total, size) in [(0u64, 1u64), (1, 1), (10, 3), (10, 5), (7, 10), (100, 1)] {
            let parts: Vec<_> = chunks(0..total, size).collect();

            let mut expected_start = 0;
            for part in &parts {
                assert_eq!(part.start, expected_start);
                assert!(part.end > part.start);
                expected_start = part.end;
            }
            assert_eq!(expected_start, total);

            if let Some(last) = parts.last() {
                let remainder = total % size;
                let expected = if remainder == 0 { size } else { remainder };
                assert_eq!(last.end - last.start, expected);
            } else {
                assert_eq!(total, 0);
            }
        }
    }

    #[test]
    fn test_chunks_with_offset_start() {
        let parts: Vec<_> = chunks(500..1200, 500).collect();
        assert_eq!(parts, vec![500..1000, 1000..1200]);
    }

    #[test]
    fn test_chunks_near_u64_max() {
        let parts: Vec<_> = chunks(u64::MAX - 3..u64::MAX, 2).collect();
        assert_eq!(parts, vec![u64::MAX - 3..u64::MAX - 1, u64::MAX - 1..u64::MAX]);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let err = ChunkDriver::new(ChunkConfig {
            chunk_size: 0,
            ..Default::default()
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::ZeroChunkSize);

        let err = ChunkDriver::new(ChunkConfig {
            min_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvertedDelay { .. }));
    }

    #[test]
    fn test_pause_stays_within_window() {
        let min = Duration::from_millis(200);
        let max = Duration::from_millis(300);
        for _ in 0..1000 {
            let pause = pause_length(min, max);
            assert!(pause >= min && pause <= max, "{pause:?} outside window");
        }
        assert_eq!(pause_length(Duration::ZERO, Duration::ZERO), Duration::ZERO);
        assert_eq!(pause_length(min, min), min);
    }

    #[tokio::test]
    async fn test_failed_chunk_is_skipped_and_run_continues() {
        let mut seen = Vec::new();
        let report = instant_driver(4)
            .run(
                0..12,
                |chunk: Range<u64>| async move {
                    if chunk.start == 4 {
                        anyhow::bail!("upstream hiccup");
                    }
                    Ok(chunk.clone().collect::<Vec<_>>())
                },
                |_, items: Vec<u64>| {
                    seen.extend(items);
                    Ok(())
                },
            )
            .await;

        assert_eq!(report.chunks, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, vec![4..8]);
        assert!(!report.is_complete());
        assert_eq!(seen, vec![0, 1, 2, 3, 8, 9, 10, 11]);
    }

    #[tokio::test]
    async fn test_sink_failure_counts_as_failed_chunk() {
        let report = instant_driver(5)
            .run(
                0..10,
                |chunk: Range<u64>| async move { anyhow::Ok(chunk.start) },
                |_, start: u64| {
                    if start == 0 {
                        anyhow::bail!("disk full");
                    }
                    Ok(())
                },
            )
            .await;

        assert_eq!(report.failed, vec![0..5]);
        assert_eq!(report.succeeded, 1);
    }
}
