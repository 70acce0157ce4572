use serde::Serialize;

use crate::fetch::FetchResult;

/// One row per trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TripSummary {
    pub train_number: Option<i64>,
    /// `YYYY-MM-DD`, or empty when the payload has no scheduling zero.
    pub trip_date: String,
    pub train_type: Option<String>,
    pub category: Option<String>,
    pub origin_id: Option<String>,
    pub origin: Option<String>,
    pub destination_id: Option<String>,
    pub destination: Option<String>,
    pub num_stops: usize,
    pub num_deleted_stops: usize,
}

/// Delays in whole seconds. `None` means unknown, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delays {
    pub incoming: Option<i64>,
    pub segment: Option<i64>,
    pub final_: Option<i64>,
}

/// One row per traversed boundary: a dwell at a station or a run between
/// two stations. Timestamps are epoch seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SegmentRecord {
    pub train_number: Option<i64>,
    pub trip_date: String,
    pub step: usize,
    pub from_id: Option<String>,
    pub from_planned: Option<i64>,
    pub from_real: Option<i64>,
    pub to_id: Option<String>,
    pub to_planned: Option<i64>,
    pub to_real: Option<i64>,
    pub inc_delay: Option<i64>,
    pub seg_delay: Option<i64>,
    pub fin_delay: Option<i64>,
}

impl SegmentRecord {
    pub fn delays(&self) -> Delays {
        Delays {
            incoming: self.inc_delay,
            segment: self.seg_delay,
            final_: self.fin_delay,
        }
    }
}

/// Counts over one batch of fetch results.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub total: usize,
    pub succeeded: usize,
    pub empty: usize,
    pub non_200: usize,
    pub transient: usize,
}

impl BatchStats {
    pub fn from_results(results: &[FetchResult]) -> Self {
        let mut s = BatchStats {
            total: results.len(),
            ..Default::default()
        };

        for r in results {
            if r.succeeded {
                s.succeeded += 1;
            }

            if r.is_empty() {
                s.empty += 1;
            }

            if r.is_transient_failure() {
                s.transient += 1;
            } else if !r.succeeded {
                s.non_200 += 1;
            }
        }

        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn success_pct(&self) -> f64 {
        Self::pct(self.succeeded, self.total)
    }
}
