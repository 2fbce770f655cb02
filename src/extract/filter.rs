use crate::event::EventRecord;

/// Returns true if any keyword occurs, case-insensitively, in the record's
/// name, location or organizer
///
/// An empty keyword list matches everything.
pub fn matches_keywords(record: &EventRecord, keywords: &[String]) -> bool {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        return true;
    }

    let haystack = record.searchable_text();
    keywords.iter().any(|keyword| haystack.contains(keyword.as_str()))
}

/// Keeps records matching at least one keyword
pub fn filter_by_keywords(records: Vec<EventRecord>, keywords: &[String]) -> Vec<EventRecord> {
    if keywords.is_empty() {
        return records;
    }

    let before = records.len();
    let kept: Vec<EventRecord> = records
        .into_iter()
        .filter(|record| matches_keywords(record, keywords))
        .collect();

    tracing::debug!(
        "Keyword filter {:?} kept {} of {} record(s)",
        keywords,
        kept.len(),
        before
    );
    kept
}
