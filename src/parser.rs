//! Trip status parser: summaries, segments and per-segment delays.

use anyhow::{Context, Result};
use chrono::TimeZone;
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::records::{Delays, SegmentRecord, TripSummary};
use crate::trip::{Stop, TripPayload};

/// Decodes one `andamentoTreno` body.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON object.
pub fn parse_trip(bytes: &[u8]) -> Result<TripPayload> {
    serde_json::from_slice(bytes).context("decoding trip status payload")
}

/// Epoch milliseconds to epoch seconds, truncating.
pub fn ms_to_secs(ms: i64) -> i64 {
    ms / 1000
}

/// `(actual - planned)` in whole seconds, ties rounded to even.
fn delta_secs(planned: i64, actual: i64) -> Option<i64> {
    let diff = actual.checked_sub(planned)?;
    Some((diff as f64 / 1000.0).round_ties_even() as i64)
}

/// Delays over one segment from its start and end timing pairs (epoch ms).
///
/// | start pair | end pair | populated |
/// |------------|----------|-----------|
/// | incomplete | complete | final |
/// | complete | incomplete | incoming |
/// | incomplete | incomplete | nothing (warned) |
/// | complete | complete | incoming, final, segment = final - incoming |
pub fn delay(
    planned_start: Option<i64>,
    actual_start: Option<i64>,
    planned_end: Option<i64>,
    actual_end: Option<i64>,
) -> Delays {
    let start = planned_start.zip(actual_start);
    let end = planned_end.zip(actual_end);

    let computed = match (start, end) {
        (None, Some((planned, actual))) => {
            debug!("Segment start unknown, final delay only");
            delta_secs(planned, actual).map(|fin| Delays {
                final_: Some(fin),
                ..Default::default()
            })
        }
        (Some((planned, actual)), None) => {
            debug!("Segment end unknown, incoming delay only");
            delta_secs(planned, actual).map(|inc| Delays {
                incoming: Some(inc),
                ..Default::default()
            })
        }
        (None, None) => {
            warn!("No complete timing pair for segment, delays unknown");
            return Delays::default();
        }
        (Some(start), Some(end)) => full_delays(start, end),
    };

    computed.unwrap_or_else(|| {
        warn!(
            ?planned_start,
            ?actual_start,
            ?planned_end,
            ?actual_end,
            "Delay arithmetic failed, delays unknown"
        );
        Delays::default()
    })
}

fn full_delays(
    (planned_start, actual_start): (i64, i64),
    (planned_end, actual_end): (i64, i64),
) -> Option<Delays> {
    let incoming = delta_secs(planned_start, actual_start)?;
    let final_ = delta_secs(planned_end, actual_end)?;
    Some(Delays {
        incoming: Some(incoming),
        segment: Some(final_.checked_sub(incoming)?),
        final_: Some(final_),
    })
}

/// Turns trip payloads into records, formatting dates in the zone the
/// upstream derives its epoch values from.
#[derive(Debug, Clone, Copy)]
pub struct TripParser {
    tz: Tz,
}

impl Default for TripParser {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Europe::Rome,
        }
    }
}

impl TripParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// `YYYY-MM-DD` of the scheduling zero, or empty if it is missing.
    pub fn trip_date(&self, payload: &TripPayload) -> String {
        payload
            .scheduling_zero
            .and_then(|ms| self.tz.timestamp_millis_opt(ms).single())
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default()
    }

    pub fn parse_summary(&self, payload: &TripPayload) -> TripSummary {
        let signals = payload.deletion_signals();
        if !signals.is_empty() {
            warn!(
                train_number = ?payload.train_number,
                train_type = ?payload.train_type,
                signals = ?signals,
                "Train looks cancelled or altered"
            );
        }

        TripSummary {
            train_number: payload.train_number,
            trip_date: self.trip_date(payload),
            train_type: payload.train_type.clone(),
            category: payload.category.clone(),
            origin_id: payload.origin_id.clone(),
            origin: payload.origin.clone(),
            destination_id: payload.destination_id.clone(),
            destination: payload.destination.clone(),
            num_stops: payload.stops.len(),
            num_deleted_stops: payload.deleted_stop_count(),
        }
    }

    /// Two records per adjacent stop pair: the dwell at `from`, then the run
    /// from `from` to `to`. Fewer than two stops yield nothing.
    pub fn parse_segments(&self, payload: &TripPayload) -> Vec<SegmentRecord> {
        let trip_date = self.trip_date(payload);
        let mut records = Vec::with_capacity(payload.stops.len().saturating_sub(1) * 2);

        for pair in payload.stops.windows(2) {
            let (from, to) = (&pair[0], &pair[1]);

            let dwell = segment(
                payload,
                &trip_date,
                records.len(),
                (from, from.planned_arrival, from.actual_arrival),
                (from, from.planned_departure, from.actual_departure),
            );
            records.push(dwell);

            let travel = segment(
                payload,
                &trip_date,
                records.len(),
                (from, from.planned_departure, from.actual_departure),
                (to, to.planned_arrival, to.actual_arrival),
            );
            records.push(travel);
        }

        records
    }
}

type Endpoint<'a> = (&'a Stop, Option<i64>, Option<i64>);

fn segment(
    payload: &TripPayload,
    trip_date: &str,
    step: usize,
    (from, from_planned, from_real): Endpoint<'_>,
    (to, to_planned, to_real): Endpoint<'_>,
) -> SegmentRecord {
    let delays = delay(from_planned, from_real, to_planned, to_real);

    SegmentRecord {
        train_number: payload.train_number,
        trip_date: trip_date.to_string(),
        step,
        from_id: from.id.clone(),
        from_planned: from_planned.map(ms_to_secs),
        from_real: from_real.map(ms_to_secs),
        to_id: to.id.clone(),
        to_planned: to_planned.map(ms_to_secs),
        to_real: to_real.map(ms_to_secs),
        inc_delay: delays.incoming,
        seg_delay: delays.segment,
        fin_delay: delays.final_,
    }
}
