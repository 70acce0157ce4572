//! URL templates for the ViaggiaTreno operations the pipelines use.

use crate::config::DEFAULT_BASE_URL;
use crate::fetch::RequestDescriptor;

/// Station name prefixes queried to enumerate the station list.
pub const STATION_PREFIXES: &str = "ABCDEFGHILMNOPQRSTUV";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn operation(&self, operation: &str, ids: &[&str]) -> RequestDescriptor {
        let mut url = format!("{}/{}", self.base_url, operation);
        for id in ids {
            url.push('/');
            url.push_str(id);
        }
        RequestDescriptor::get(url)
    }

    /// Stations whose name starts with `prefix`.
    pub fn search_station(&self, prefix: &str) -> RequestDescriptor {
        self.operation("cercaStazione", &[prefix])
    }

    /// Region code of a station, returned as plain text.
    pub fn region(&self, station_id: &str) -> RequestDescriptor {
        self.operation("regione", &[station_id])
    }

    /// Autocomplete lines `NAME|NUMBER-STATION[-DATE]` for a train number.
    pub fn train_autocomplete(&self, train_number: u64) -> RequestDescriptor {
        self.operation(
            "cercaNumeroTrenoTrenoAutocomplete",
            &[&train_number.to_string()],
        )
    }

    /// Live status of a train departing from `station_id`.
    pub fn train_status(&self, station_id: &str, train_number: &str) -> RequestDescriptor {
        self.operation("andamentoTreno", &[station_id, train_number])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        let endpoints = Endpoints::new("http://host/api/");
        assert_eq!(endpoints.search_station("A").url(), "http://host/api/cercaStazione/A");
        assert_eq!(endpoints.region("S01700").url(), "http://host/api/regione/S01700");
        assert_eq!(
            endpoints.train_autocomplete(9620).url(),
            "http://host/api/cercaNumeroTrenoTrenoAutocomplete/9620"
        );
        assert_eq!(
            endpoints.train_status("S01700", "9620").url(),
            "http://host/api/andamentoTreno/S01700/9620"
        );
    }

    #[test]
    fn test_default_base() {
        assert!(
            Endpoints::default()
                .region("S1")
                .url()
                .starts_with("http://www.viaggiatreno.it/")
        );
    }
}
