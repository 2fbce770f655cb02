//! Statistics over a record set
//!
//! This module computes the aggregate view of a set of event records and
//! prints it for the command line.

use crate::event::{EventRecord, Origin};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Number of entries kept in each "top" list
const TOP_N: usize = 10;

/// Words too common to be useful as name terms
const STOP_WORDS: &[&str] = &[
    "and", "the", "for", "with", "from", "your", "you", "our", "into", "about", "this", "that",
    "event", "meetup",
];

/// Record set statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    /// Number of records in the set
    pub total_events: usize,

    /// Distinct organizers, compared case-insensitively
    pub distinct_organizer_count: usize,

    pub unique_locations: usize,

    /// Fraction of records with a date/time, in `0.0..=1.0`
    pub date_time_coverage: f64,

    /// Fraction of records with a location, in `0.0..=1.0`
    pub location_coverage: f64,

    pub by_origin: BTreeMap<Origin, usize>,

    pub top_organizers: Vec<(String, usize)>,

    pub top_locations: Vec<(String, usize)>,

    pub organizer_distribution: BTreeMap<String, usize>,

    pub location_distribution: BTreeMap<String, usize>,

    /// Records per date/time string, compared case-insensitively
    pub date_time_distribution: BTreeMap<String, usize>,

    /// Most frequent words in event names
    pub top_terms: Vec<(String, usize)>,

    /// Records matching each supplied keyword; empty when none were given
    pub keyword_hits: BTreeMap<String, usize>,
}

/// Counts values case-insensitively, reporting each under its first spelling
#[derive(Default)]
struct Tally {
    counts: HashMap<String, (String, usize)>,
}

impl Tally {
    fn add(&mut self, value: &str) {
        let key = value.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.counts
            .entry(key)
            .or_insert_with(|| (value.trim().to_string(), 0))
            .1 += 1;
    }

    fn len(&self) -> usize {
        self.counts.len()
    }

    fn distribution(&self) -> BTreeMap<String, usize> {
        self.counts.values().cloned().collect()
    }

    /// Highest counts first, ties broken alphabetically
    fn top(&self, n: usize) -> Vec<(String, usize)> {
        let mut entries: Vec<_> = self.counts.values().cloned().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }
}

fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn name_terms(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|term| term.chars().count() >= 3 && !STOP_WORDS.contains(&term.as_str()))
}

/// Computes statistics for a record set
pub fn stats(records: &[EventRecord]) -> StatsSummary {
    stats_with_keywords(records, &[])
}

/// Computes statistics, also counting how many records match each keyword
///
/// # Arguments
///
/// * `records` - The record set
/// * `keywords` - Keywords to count hits for, matched like the keyword filter
///
/// # Returns
///
/// The computed summary; an empty record set yields zero counts and coverage.
pub fn stats_with_keywords(records: &[EventRecord], keywords: &[String]) -> StatsSummary {
    let mut organizers = Tally::default();
    let mut locations = Tally::default();
    let mut dates = Tally::default();
    let mut terms = Tally::default();
    let mut by_origin = BTreeMap::new();
    let mut with_date = 0;
    let mut with_location = 0;

    for record in records {
        *by_origin.entry(record.origin()).or_insert(0) += 1;

        if let Some(organizer) = &record.organizer_name {
            organizers.add(organizer);
        }
        if let Some(location) = &record.location {
            locations.add(location);
            with_location += 1;
        }
        if let Some(date_time) = &record.date_time {
            dates.add(date_time);
            with_date += 1;
        }
        if let Some(name) = &record.name {
            for term in name_terms(name) {
                terms.add(&term);
            }
        }
    }

    let keyword_hits = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(|keyword| {
            let needle = keyword.to_lowercase();
            let hits = records
                .iter()
                .filter(|r| r.searchable_text().contains(&needle))
                .count();
            (keyword.to_string(), hits)
        })
        .collect();

    StatsSummary {
        total_events: records.len(),
        distinct_organizer_count: organizers.len(),
        unique_locations: locations.len(),
        date_time_coverage: fraction(with_date, records.len()),
        location_coverage: fraction(with_location, records.len()),
        by_origin,
        top_organizers: organizers.top(TOP_N),
        top_locations: locations.top(TOP_N),
        organizer_distribution: organizers.distribution(),
        location_distribution: locations.distribution(),
        date_time_distribution: dates.distribution(),
        top_terms: terms.top(TOP_N),
        keyword_hits,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &StatsSummary) {
    println!("=== Event Statistics ===\n");

    println!("Overview:");
    println!("  Total events: {}", stats.total_events);
    println!("  Distinct organizers: {}", stats.distinct_organizer_count);
    println!("  Unique locations: {}", stats.unique_locations);
    println!(
        "  With date/time: {:.1}%",
        stats.date_time_coverage * 100.0
    );
    println!("  With location: {:.1}%", stats.location_coverage * 100.0);
    println!();

    if !stats.by_origin.is_empty() {
        println!("Events by Origin:");
        for (origin, count) in &stats.by_origin {
            println!("  {}: {}", origin, count);
        }
        println!();
    }

    for (title, entries) in [
        ("Top Organizers", &stats.top_organizers),
        ("Top Locations", &stats.top_locations),
        ("Top Name Terms", &stats.top_terms),
    ] {
        if entries.is_empty() {
            continue;
        }
        println!("{}:", title);
        for (value, count) in entries {
            println!("  {}: {}", value, count);
        }
        println!();
    }

    if !stats.keyword_hits.is_empty() {
        println!("Keyword Hits:");
        for (keyword, hits) in &stats.keyword_hits {
            println!("  {}: {}", keyword, hits);
        }
        println!();
    }
}
