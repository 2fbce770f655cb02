//! Structured (JSON) output

use crate::event::{BatchRun, EventRecord};
use crate::output::OutputResult;
use serde::Deserialize;

/// Shapes accepted when reading records back
#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsInput {
    List(Vec<EventRecord>),
    Wrapped {
        #[serde(alias = "events")]
        records: Vec<EventRecord>,
    },
    Batch(BatchRun),
}

/// Writes records as a pretty-printed JSON array
pub fn to_json(records: &[EventRecord]) -> OutputResult<Vec<u8>> {
    let mut content = serde_json::to_vec_pretty(records)?;
    content.push(b'\n');
    Ok(content)
}

/// Reads records from JSON
///
/// Accepts a bare array, an object with a `records` (or `events`) array, or a
/// serialized [`BatchRun`], whose records are flattened in entry order.
pub fn from_json(content: &[u8]) -> OutputResult<Vec<EventRecord>> {
    let records = match serde_json::from_slice::<RecordsInput>(content)? {
        RecordsInput::List(records) | RecordsInput::Wrapped { records } => records,
        RecordsInput::Batch(run) => run.into_records(),
    };
    Ok(records)
}
