use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

use super::train_numbers::TrainNumberEntry;
use super::{Harvester, log_batch, usable};
use crate::chunk::ChunkReport;
use crate::endpoints::Endpoints;
use crate::fetch::{FetchResult, RequestDescriptor};
use crate::output::{append_records, dated_csv_path};
use crate::parser::{TripParser, parse_trip};
use crate::records::{SegmentRecord, TripSummary};

/// Records parsed from one batch of status responses.
#[derive(Debug, Default)]
pub struct TripBatch {
    pub summaries: Vec<TripSummary>,
    pub segments: Vec<SegmentRecord>,
    /// Non-empty bodies that did not decode as a trip.
    pub skipped: usize,
}

/// Reads the discovery CSV. Rows that do not deserialize are skipped.
pub fn read_train_numbers(path: &Path) -> Result<Vec<TrainNumberEntry>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);

    let mut entries = Vec::new();
    for (row, result) in rdr.deserialize::<TrainNumberEntry>().enumerate() {
        match result {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!(row, error = %e, "Skipping unreadable train number row"),
        }
    }
    Ok(entries)
}

/// One `andamentoTreno` request per distinct (station, train) pair, in
/// first-seen order.
pub fn status_requests(endpoints: &Endpoints, entries: &[TrainNumberEntry]) -> Vec<RequestDescriptor> {
    let mut seen = HashSet::new();
    let mut requests = Vec::new();
    for e in entries {
        if seen.insert((e.starting_station.as_str(), e.train_number.as_str())) {
            requests.push(endpoints.train_status(&e.starting_station, &e.train_number));
        }
    }
    requests
}

/// Parses every usable body. A body that is not a trip is logged and
/// counted, never fatal.
pub fn parse_statuses(parser: &TripParser, results: &[FetchResult]) -> TripBatch {
    let mut batch = TripBatch::default();
    for result in usable(results) {
        match parse_trip(&result.body) {
            Ok(payload) => {
                batch.summaries.push(parser.parse_summary(&payload));
                batch.segments.extend(parser.parse_segments(&payload));
            }
            Err(e) => {
                warn!(url = result.source.url(), error = %e, "Skipping undecodable trip");
                batch.skipped += 1;
            }
        }
    }
    batch
}

impl Harvester {
    /// Fetches the status of every train listed in `input` and appends the
    /// records to the per-day files for `date`.
    #[tracing::instrument(skip(self, input, date), fields(input = %input.display(), date = %date))]
    pub async fn harvest_train_status(&self, input: &Path, date: NaiveDate) -> Result<ChunkReport> {
        let entries = read_train_numbers(input)?;
        let requests = status_requests(&self.endpoints, &entries);
        info!(entries = entries.len(), requests = requests.len(), "Train list loaded");

        let data_dir = &self.config.data_dir;
        let summary_path = dated_csv_path(&data_dir.join("train_status"), date)?;
        let segment_path = dated_csv_path(&data_dir.join("single_train_status"), date)?;

        let mut trips = 0usize;
        let report = self
            .driver
            .run(
                0..requests.len() as u64,
                |chunk| {
                    let slice = &requests[chunk.start as usize..chunk.end as usize];
                    async move {
                        let results = self.fetcher.fetch_all(slice).await?;
                        log_batch("train_status", &results);
                        anyhow::Ok(parse_statuses(&self.parser, &results))
                    }
                },
                |_, batch: TripBatch| {
                    debug!(
                        summaries = batch.summaries.len(),
                        segments = batch.segments.len(),
                        skipped = batch.skipped,
                        "Writing trip batch"
                    );
                    trips += batch.summaries.len();
                    append_records(&summary_path, &batch.summaries)?;
                    append_records(&segment_path, &batch.segments)
                },
            )
            .await;

        info!(
            trips,
            summaries = %summary_path.display(),
            segments = %segment_path.display(),
            "Train status written"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::fs;

    fn entry(number: &str, station: &str) -> TrainNumberEntry {
        TrainNumberEntry {
            train_name: format!("{number} - X"),
            train_number: number.into(),
            starting_station: station.into(),
            departure_date: None,
        }
    }

    #[test]
    fn test_status_requests_deduplicate() {
        let endpoints = Endpoints::new("http://h");
        let entries = vec![
            entry("9620", "S01700"),
            entry("9620", "S01700"),
            entry("2100", "S01700"),
        ];

        let requests = status_requests(&endpoints, &entries);

        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url(), "http://h/andamentoTreno/S01700/9620");
        assert_eq!(requests[1].url(), "http://h/andamentoTreno/S01700/2100");
    }

    #[test]
    fn test_parse_statuses_skips_bad_bodies() {
        let req = RequestDescriptor::get("http://h/andamentoTreno/S1/1");
        let trip = r#"{"numeroTreno": 1, "fermate": [
            {"id": "S1", "partenza_teorica": 1000000, "partenzaReale": 1060000},
            {"id": "S2", "arrivo_teorico": 2000000, "arrivoReale": 2120000}
        ]}"#;
        let results = vec![
            FetchResult::from_response(req.clone(), 200, Bytes::from(trip)),
            FetchResult::from_response(req.clone(), 200, Bytes::from_static(b"<html>")),
            FetchResult::from_response(req.clone(), 200, Bytes::new()),
            FetchResult::transient(req),
        ];

        let batch = parse_statuses(&TripParser::default(), &results);

        assert_eq!(batch.summaries.len(), 1);
        assert_eq!(batch.segments.len(), 2);
        assert_eq!(batch.skipped, 1);
        assert_eq!(batch.segments[1].inc_delay, Some(60));
        assert_eq!(batch.segments[1].fin_delay, Some(120));
        assert_eq!(batch.segments[1].seg_delay, Some(60));
    }

    #[test]
    fn test_read_train_numbers_roundtrip() {
        let path = std::env::temp_dir().join("viaggiatreno_test_numbers.csv");
        let _ = fs::remove_file(&path);
        let written = vec![entry("9620", "S01700"), entry("2100", "S08409")];
        append_records(&path, &written).unwrap();

        let read = read_train_numbers(&path).unwrap();

        assert_eq!(read, written);
        fs::remove_file(&path).unwrap();
    }
}
