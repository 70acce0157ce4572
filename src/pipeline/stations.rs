use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use tracing::{info, warn};

use super::{Harvester, log_batch, usable};
use crate::endpoints::STATION_PREFIXES;
use crate::fetch::FetchResult;
use crate::output::{append_records, truncate, write_json};

/// A station as listed by `cercaStazione`, plus its region code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub id: String,
    #[serde(rename = "nomeLungo", default)]
    pub long_name: Option<String>,
    #[serde(rename = "nomeBreve", default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

/// Merges every station page into one map keyed by station id. Pages that
/// do not decode are logged and skipped.
pub fn merge_station_pages(results: &[FetchResult]) -> BTreeMap<String, Station> {
    let mut stations = BTreeMap::new();
    for result in usable(results) {
        match serde_json::from_slice::<Vec<Station>>(&result.body) {
            Ok(page) => {
                for station in page {
                    stations.insert(station.id.clone(), station);
                }
            }
            Err(e) => warn!(url = result.source.url(), error = %e, "Station page not decodable"),
        }
    }
    stations
}

/// Attaches the plain-text region code of each `regione/<id>` response to
/// its station.
pub fn apply_regions(stations: &mut BTreeMap<String, Station>, results: &[FetchResult]) {
    for result in usable(results) {
        let region = result.text().trim().to_string();
        if region.is_empty() {
            continue;
        }
        if let Some(station) = stations.get_mut(result.source.last_segment()) {
            station.region = Some(region);
        }
    }
}

impl Harvester {
    /// Builds the station list and writes `stations.json` and
    /// `stations.csv` under the data directory.
    #[tracing::instrument(skip(self), fields(data_dir = %self.config.data_dir.display()))]
    pub async fn harvest_stations(&self) -> Result<Vec<Station>> {
        let pages: Vec<_> = STATION_PREFIXES
            .chars()
            .map(|c| self.endpoints.search_station(&c.to_string()))
            .collect();
        let results = self.fetcher.fetch_all(&pages).await?;
        log_batch("stations", &results);
        let mut stations = merge_station_pages(&results);
        info!(stations = stations.len(), "Station list merged");

        let region_requests: Vec<_> = stations.keys().map(|id| self.endpoints.region(id)).collect();
        info!(requests = region_requests.len(), "Fetching station regions");
        let results = self.fetcher.fetch_all(&region_requests).await?;
        log_batch("regions", &results);
        apply_regions(&mut stations, &results);

        let stations: Vec<Station> = stations.into_values().collect();

        fs::create_dir_all(&self.config.data_dir)?;
        write_json(&self.config.data_dir.join("stations.json"), &stations)?;
        let csv_path = self.config.data_dir.join("stations.csv");
        truncate(&csv_path)?;
        append_records(&csv_path, &stations)?;

        info!(stations = stations.len(), "Stations written");
        Ok(stations)
    }
}
