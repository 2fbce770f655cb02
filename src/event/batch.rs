use crate::event::{EventRecord, SourceDescriptor};
use crate::ScrapeError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Classification of a per-entry failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientFetch,
    TerminalFetch,
    InvalidDescriptor,
    UnknownCity,
    RenderingUnavailable,
    ExtractionFailed,
    Timeout,
    Internal,
}

/// Error annotation attached to a batch entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ScrapeError> for EntryError {
    fn from(err: &ScrapeError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for EntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Result for one input descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchEntry {
    pub descriptor: SourceDescriptor,

    pub records: Vec<EventRecord>,

    /// Set when the descriptor failed, or partially failed
    pub error: Option<EntryError>,

    /// Listing occurrences skipped as malformed
    #[serde(default)]
    pub skipped: usize,
}

impl BatchEntry {
    pub fn succeeded(descriptor: SourceDescriptor, records: Vec<EventRecord>, skipped: usize) -> Self {
        Self {
            descriptor,
            records,
            error: None,
            skipped,
        }
    }

    pub fn failed(descriptor: SourceDescriptor, error: &ScrapeError) -> Self {
        Self {
            descriptor,
            records: Vec::new(),
            error: Some(EntryError::from(error)),
            skipped: 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered result of one orchestration call: one entry per input descriptor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRun {
    pub entries: Vec<BatchEntry>,
}

impl BatchRun {
    pub fn new(entries: Vec<BatchEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.entries.iter().map(|entry| entry.records.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_ok()).count()
    }

    /// All records, in entry order
    pub fn records(&self) -> impl Iterator<Item = &EventRecord> {
        self.entries.iter().flat_map(|entry| entry.records.iter())
    }

    pub fn into_records(self) -> Vec<EventRecord> {
        self.entries
            .into_iter()
            .flat_map(|entry| entry.records)
            .collect()
    }

    /// Collapses records sharing a `source_url` across the whole run
    ///
    /// The winner stays in the entry that produced it; losers are removed
    /// from theirs. Returns the number of records removed.
    pub fn dedup(&mut self) -> usize {
        let mut best: HashMap<&str, (usize, usize, &EventRecord)> = HashMap::new();

        for (entry_idx, entry) in self.entries.iter().enumerate() {
            for (record_idx, record) in entry.records.iter().enumerate() {
                match best.get(record.source_url.as_str()) {
                    Some((_, _, current)) if !outranks(record, current) => {}
                    _ => {
                        best.insert(&record.source_url, (entry_idx, record_idx, record));
                    }
                }
            }
        }

        let winners: HashSet<(usize, usize)> = best
            .values()
            .map(|(entry_idx, record_idx, _)| (*entry_idx, *record_idx))
            .collect();

        let before = self.total_records();
        for (entry_idx, entry) in self.entries.iter_mut().enumerate() {
            let mut record_idx = 0;
            entry.records.retain(|_| {
                let keep = winners.contains(&(entry_idx, record_idx));
                record_idx += 1;
                keep
            });
        }

        before - self.total_records()
    }
}

/// Collapses records sharing a `source_url`, keeping first-seen order
pub fn dedup_records(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut kept: Vec<EventRecord> = Vec::with_capacity(records.len());

    for record in records {
        match index.get(&record.source_url) {
            Some(&pos) => {
                if outranks(&record, &kept[pos]) {
                    kept[pos] = record;
                }
            }
            None => {
                index.insert(record.source_url.clone(), kept.len());
                kept.push(record);
            }
        }
    }

    kept
}

/// True if `candidate`, seen later, should replace `current`
///
/// Richer records win; on equal richness the more recent fetch wins, and a
/// later record wins an exact tie.
fn outranks(candidate: &EventRecord, current: &EventRecord) -> bool {
    let (new, old) = (candidate.richness(), current.richness());
    new > old || (new == old && candidate.fetched_at >= current.fetched_at)
}
