//! Reporter: statistics and serialization over record sets
//!
//! Everything here is a pure function of already-produced
//! [`EventRecord`](crate::EventRecord) values; nothing depends on fetch or
//! extraction state, so a caller can pass back records from an earlier run.

mod csv_output;
mod json_output;
mod markdown;
pub mod stats;

pub use csv_output::{from_csv, to_csv, CSV_COLUMNS};
pub use json_output::{from_json, to_json};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_statistics, stats, stats_with_keywords, StatsSummary};

use crate::event::{dedup_records, EventRecord};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to format output: {0}")]
    Format(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Interchange formats a record set can be written to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(OutputError::Format(format!(
                "unknown format '{}', expected json or csv",
                other
            ))),
        }
    }
}

/// Serializes a record set
///
/// # Arguments
///
/// * `records` - Records to write, in the order they should appear
/// * `format` - Target format
///
/// # Returns
///
/// * `Ok(Vec<u8>)` - UTF-8 encoded content
/// * `Err(OutputError)` - Serialization failed
pub fn serialize(records: &[EventRecord], format: ExportFormat) -> OutputResult<Vec<u8>> {
    match format {
        ExportFormat::Json => to_json(records),
        ExportFormat::Csv => to_csv(records),
    }
}

/// Parses a record set previously written by [`serialize`]
pub fn deserialize(content: &[u8], format: ExportFormat) -> OutputResult<Vec<EventRecord>> {
    match format {
        ExportFormat::Json => from_json(content),
        ExportFormat::Csv => from_csv(content),
    }
}

/// Loads a saved record set, picking the format from the file extension
///
/// Records sharing a `source_url` collapse to the richest one, at the
/// position the URL was first seen.
///
/// # Arguments
///
/// * `path` - A `.csv` file, or JSON for any other extension
///
/// # Returns
///
/// * `Ok(Vec<EventRecord>)` - Deduplicated records
/// * `Err(OutputError)` - The file could not be read or parsed
pub fn read_records(path: &Path) -> OutputResult<Vec<EventRecord>> {
    let raw = std::fs::read(path)?;
    let format = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
        _ => ExportFormat::Json,
    };

    let records = deserialize(&raw, format)?;
    let before = records.len();
    let records = dedup_records(records);
    if records.len() < before {
        tracing::debug!(
            "Collapsed {} duplicate record(s) from {}",
            before - records.len(),
            path.display()
        );
    }

    Ok(records)
}
