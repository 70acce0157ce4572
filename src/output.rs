//! Writer collaborator: CSV and JSON persistence for harvested records.
//!
//! CSV files are appended to, with the header written only when the file is
//! new or empty, so repeated runs on the same day accumulate rows.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Appends `records` as CSV rows to `path`, creating it with a header if it
/// does not exist yet.
pub fn append_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let needs_header = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    debug!(path = %path.display(), needs_header, rows = records.len(), "Appending CSV records");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let mut writer = WriterBuilder::new()
        .has_headers(needs_header) // IMPORTANT when appending
        .from_writer(file);

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Empties `path` (creating it if needed) so the next append starts over.
pub fn truncate(path: &Path) -> Result<()> {
    File::create(path).with_context(|| format!("truncating {}", path.display()))?;
    Ok(())
}

/// Empties `path` and writes a single header row, so the file is a valid CSV
/// even if no record is ever appended.
pub fn write_header(path: &Path, columns: &[&str]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(columns)?;
    writer.flush()?;
    Ok(())
}

/// Writes `value` to `path` as pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

/// `<dir>/<YYYY-MM-DD>.csv`, creating `dir` if needed.
pub fn dated_csv_path(dir: &Path, date: NaiveDate) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir.join(format!("{}.csv", date.format("%Y-%m-%d"))))
}
