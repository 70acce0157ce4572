use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use tracing::{info, warn};

use super::{Harvester, log_batch, usable};
use crate::chunk::ChunkReport;
use crate::config::ConfigError;
use crate::output::{append_records, write_header};

/// A train number resolved to the station it departs from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrainNumberEntry {
    pub train_name: String,
    pub train_number: String,
    pub starting_station: String,
    /// Epoch ms of the departure day, when the upstream includes it.
    #[serde(default)]
    pub departure_date: Option<i64>,
}

impl TrainNumberEntry {
    /// CSV header, in field order.
    pub const COLUMNS: [&str; 4] = [
        "train_name",
        "train_number",
        "starting_station",
        "departure_date",
    ];
}

/// Parses an autocomplete body: one `NAME|NUMBER-STATION[-DATE]` entry per
/// line. Blank lines are ignored and malformed ones are logged and dropped.
pub fn parse_autocomplete(body: &str) -> Vec<TrainNumberEntry> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let entry = parse_line(line);
            if entry.is_none() {
                warn!(line, "Unrecognised autocomplete line");
            }
            entry
        })
        .collect()
}

fn parse_line(line: &str) -> Option<TrainNumberEntry> {
    let (name, key) = line.split_once('|')?;
    let mut parts = key.split('-');
    let train_number = parts.next().filter(|s| !s.is_empty())?;
    let starting_station = parts.next().filter(|s| !s.is_empty())?;
    let departure_date = parts.next().and_then(|s| s.parse::<i64>().ok());

    Some(TrainNumberEntry {
        train_name: name.trim().to_string(),
        train_number: train_number.to_string(),
        starting_station: starting_station.to_string(),
        departure_date,
    })
}

impl Harvester {
    /// Sweeps the candidate train numbers in `range` and writes every match
    /// to `output`, which is emptied first.
    #[tracing::instrument(skip(self, output), fields(output = %output.display()))]
    pub async fn discover_train_numbers(
        &self,
        range: Range<u64>,
        output: &Path,
    ) -> Result<ChunkReport> {
        if range.start > range.end {
            return Err(ConfigError::InvertedRange {
                start: range.start,
                end: range.end,
            }
            .into());
        }
        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir)?;
        }
        write_header(output, &TrainNumberEntry::COLUMNS)?;

        let mut found = 0usize;
        let report = self
            .driver
            .run(
                range,
                |chunk| {
                    let requests: Vec<_> = chunk
                        .map(|n| self.endpoints.train_autocomplete(n))
                        .collect();
                    async move {
                        let results = self.fetcher.fetch_all(&requests).await?;
                        log_batch("train_numbers", &results);
                        let entries: Vec<_> = usable(&results)
                            .flat_map(|r| parse_autocomplete(&r.text()))
                            .collect();
                        anyhow::Ok(entries)
                    }
                },
                |chunk, entries: Vec<TrainNumberEntry>| {
                    if entries.is_empty() {
                        info!(from = chunk.start, to = chunk.end, "Nothing to save");
                        return Ok(());
                    }
                    found += entries.len();
                    append_records(output, &entries)
                },
            )
            .await;

        info!(found, failed_chunks = report.failed.len(), "Train number discovery done");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_autocomplete() {
        let body = "9620 - MILANO CENTRALE|9620-S01700-1700000000000\n\
                    9620 - ROMA TERMINI|9620-S08409\n\
                    \n";

        let entries = parse_autocomplete(body);

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            TrainNumberEntry {
                train_name: "9620 - MILANO CENTRALE".into(),
                train_number: "9620".into(),
                starting_station: "S01700".into(),
                departure_date: Some(1_700_000_000_000),
            }
        );
        assert_eq!(entries[1].starting_station, "S08409");
        assert_eq!(entries[1].departure_date, None);
    }

    #[test]
    fn test_malformed_lines_dropped() {
        assert!(parse_autocomplete("garbage without separator").is_empty());
        assert!(parse_autocomplete("NAME|9620").is_empty());
        assert!(parse_autocomplete("").is_empty());
    }

    #[test]
    fn test_columns_match_serialized_header() {
        let path = std::env::temp_dir().join("viaggiatreno_test_number_columns.csv");
        let _ = std::fs::remove_file(&path);
        let entry = TrainNumberEntry {
            train_name: "9620 - X".into(),
            train_number: "9620".into(),
            starting_station: "S01700".into(),
            departure_date: None,
        };
        append_records(&path, &[entry]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().next(), Some(TrainNumberEntry::COLUMNS.join(",").as_str()));
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_empty_sweep_leaves_header() {
        let harvester = Harvester::new(Default::default()).unwrap();
        let output = std::env::temp_dir().join("viaggiatreno_test_empty_sweep.csv");

        let report = harvester.discover_train_numbers(7..7, &output).await.unwrap();

        assert_eq!(report.chunks, 0);
        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content, "train_name,train_number,starting_station,departure_date\n");
        std::fs::remove_file(&output).unwrap();
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let harvester = Harvester::new(Default::default()).unwrap();
        let output = std::env::temp_dir().join("viaggiatreno_test_inverted.csv");

        let err = harvester
            .discover_train_numbers(Range { start: 10, end: 5 }, &output)
            .await
            .unwrap_err();

        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
