//! Tabular (CSV) output
//!
//! Every record becomes one row with the same column set. Absent fields are
//! written as empty cells and the `csv` writer quotes any value containing a
//! delimiter, quote or newline.

use crate::event::{absent_name_value, absent_value, EventRecord, Origin};
use crate::output::{OutputError, OutputResult};
use chrono::{DateTime, Utc};

/// Column order of the CSV export; the header row is always written
pub const CSV_COLUMNS: [&str; 10] = [
    "name",
    "date_time",
    "location",
    "organizer_name",
    "organizer_social_url",
    "organizer_profile_url",
    "host_email",
    "source_url",
    "origin",
    "fetched_at",
];

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Writes records as CSV
pub fn to_csv(records: &[EventRecord]) -> OutputResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for record in records {
        let fetched_at = record.fetched_at.to_rfc3339();
        writer.write_record([
            cell(&record.name),
            cell(&record.date_time),
            cell(&record.location),
            cell(&record.organizer_name),
            cell(&record.organizer_social_url),
            cell(&record.organizer_profile_url),
            cell(&record.host_email),
            record.source_url.as_str(),
            record.origin().as_str(),
            fetched_at.as_str(),
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| OutputError::Io(e.into_error()))
}

/// Reads records from CSV written by [`to_csv`]
///
/// Columns are matched by header name, so reordered or partial exports work
/// as long as `source_url` is present. Empty cells read back as absent.
pub fn from_csv(content: &[u8]) -> OutputResult<Vec<EventRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content);

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let source_col = column("source_url")
        .or_else(|| column("event_url"))
        .ok_or_else(|| OutputError::Format("missing source_url column".to_string()))?;
    let name_col = column("name").or_else(|| column("event_name"));
    let date_col = column("date_time");
    let location_col = column("location");
    let organizer_col = column("organizer_name");
    let social_col = column("organizer_social_url").or_else(|| column("host_social_media"));
    let profile_col = column("organizer_profile_url").or_else(|| column("organizer_contact"));
    let email_col = column("host_email");
    let origin_col = column("origin");
    let fetched_col = column("fetched_at");

    let mut records = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let get = |col: Option<usize>| -> Option<String> {
            col.and_then(|i| row.get(i)).and_then(absent_value)
        };

        let source_url = get(Some(source_col)).ok_or_else(|| {
            OutputError::Format(format!("row {} has no source_url", line + 1))
        })?;
        let origin = get(origin_col)
            .and_then(|o| Origin::from_str_opt(&o))
            .unwrap_or_default();

        let mut record = EventRecord::new(source_url, origin);
        record.name = name_col.and_then(|i| row.get(i)).and_then(absent_name_value);
        record.date_time = get(date_col);
        record.location = get(location_col);
        record.organizer_name = get(organizer_col);
        record.organizer_social_url = get(social_col);
        record.organizer_profile_url = get(profile_col);
        record.host_email = get(email_col);

        if let Some(fetched) = get(fetched_col) {
            let fetched_at = DateTime::parse_from_rfc3339(&fetched).map_err(|e| {
                OutputError::Format(format!("row {}: bad fetched_at '{}': {}", line + 1, fetched, e))
            })?;
            record.fetched_at = fetched_at.with_timezone(&Utc);
        }

        records.push(record);
    }

    Ok(records)
}
