//! Competitor dataset ingestion.
//!
//! Reads the CSV export of competitor creatives, normalizes the impression
//! share column and ranks rows for analysis. Column names are matched
//! case-insensitively and missing optional columns degrade to placeholders.

use std::cmp::Ordering;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::creative::CreativeRef;

/// Placeholder used when a row carries no app name.
pub const UNKNOWN_APP: &str = "Unknown App";

/// Placeholder rendered for missing optional values.
pub const NOT_AVAILABLE: &str = "N/A";

const APP_COLUMNS: &[&str] = &["advertiser app", "advertiser app name"];
const SHARE_COLUMN: &str = "impression share";
const CREATIVE_COLUMN: &str = "creative url";
const DURATION_COLUMN: &str = "duration";

#[derive(Debug, Error)]
pub enum DatasetError {
    /// The dataset file could not be opened.
    #[error("cannot read dataset {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV stream is not decodable (bad UTF-8, I/O failure mid-read).
    #[error("malformed dataset: {0}")]
    Malformed(#[from] csv::Error),
}

/// One competitor creative as read from the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct CompetitorRow {
    /// 0-based position among the data records that were kept.
    pub position: usize,
    pub app_name: String,
    /// Impression share exactly as it appeared in the file.
    pub impression_share_raw: Option<String>,
    /// Normalized impression share, `0.0` when absent or unparseable.
    pub impression_share: f64,
    pub creative: Option<String>,
    pub duration: Option<String>,
}

impl CompetitorRow {
    /// Resolves the creative column into a local path or remote URL.
    #[must_use]
    pub fn creative_ref(&self) -> Option<CreativeRef> {
        self.creative.as_deref().and_then(CreativeRef::parse)
    }
}

/// Parses `"14.09%"` or `"14.09"` into `14.09`.
///
/// A single trailing `%` is stripped and surrounding whitespace ignored.
/// Empty, non-numeric and non-finite input all yield `0.0`; negative zero is
/// folded into `0.0`.
#[must_use]
pub fn parse_impression_share(raw: &str) -> f64 {
    let trimmed = raw.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match number.parse::<f64>() {
        Ok(v) if v.is_finite() && v != 0.0 => v,
        _ => 0.0,
    }
}

/// Reads and parses the dataset at `path`.
///
/// # Errors
///
/// Returns [`DatasetError::Unreadable`] if the file cannot be opened and
/// [`DatasetError::Malformed`] if the CSV stream cannot be decoded.
pub fn read_dataset(path: &Path) -> Result<Vec<CompetitorRow>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_dataset(file)
}

/// Parses CSV records from any reader. The first record is the header.
///
/// Ragged records are tolerated and fully blank records are skipped.
///
/// # Errors
///
/// Returns [`DatasetError::Malformed`] if the stream cannot be decoded.
pub fn parse_dataset<R: Read>(reader: R) -> Result<Vec<CompetitorRow>, DatasetError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let app_columns: Vec<usize> = APP_COLUMNS.iter().filter_map(|c| column(c)).collect();
    let share_column = column(SHARE_COLUMN);
    let creative_column = column(CREATIVE_COLUMN);
    let duration_column = column(DURATION_COLUMN);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let cell = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let app_name = app_columns
            .iter()
            .find_map(|&i| cell(Some(i)))
            .unwrap_or_else(|| UNKNOWN_APP.to_string());
        let impression_share_raw = cell(share_column);
        let impression_share = impression_share_raw
            .as_deref()
            .map_or(0.0, parse_impression_share);

        rows.push(CompetitorRow {
            position: rows.len(),
            app_name,
            impression_share_raw,
            impression_share,
            creative: cell(creative_column),
            duration: cell(duration_column),
        });
    }

    tracing::debug!(rows = rows.len(), "parsed competitor dataset");
    Ok(rows)
}

/// Returns the `limit` best rows by impression share, highest first.
///
/// The sort is stable: rows with equal share keep their input order.
#[must_use]
pub fn select_top(mut rows: Vec<CompetitorRow>, limit: usize) -> Vec<CompetitorRow> {
    rows.sort_by(|a, b| {
        b.impression_share
            .partial_cmp(&a.impression_share)
            .unwrap_or(Ordering::Equal)
    });
    rows.truncate(limit);
    rows
}

#[cfg(test)]
#[path = "dataset_test.rs"]
mod tests;
