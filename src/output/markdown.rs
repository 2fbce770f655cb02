//! Markdown summary generation
//!
//! Renders a [`StatsSummary`] as a human-readable markdown report.

use crate::output::{OutputResult, StatsSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary to a file
///
/// # Arguments
///
/// * `summary` - The computed statistics
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &StatsSummary, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn push_table(md: &mut String, title: &str, column: &str, rows: &[(String, usize)]) {
    if rows.is_empty() {
        return;
    }
    md.push_str(&format!("## {}\n\n", title));
    md.push_str(&format!("| {} | Events |\n", column));
    md.push_str("|---|---|\n");
    for (value, count) in rows {
        md.push_str(&format!("| {} | {} |\n", value.replace('|', "\\|"), count));
    }
    md.push('\n');
}

/// Formats statistics as markdown
pub fn format_markdown_summary(summary: &StatsSummary) -> String {
    let mut md = String::new();

    md.push_str("# Event Summary\n\n");

    md.push_str("## Overview\n\n");
    md.push_str(&format!("- **Total Events**: {}\n", summary.total_events));
    md.push_str(&format!(
        "- **Distinct Organizers**: {}\n",
        summary.distinct_organizer_count
    ));
    md.push_str(&format!(
        "- **Unique Locations**: {}\n",
        summary.unique_locations
    ));
    md.push_str(&format!(
        "- **Date/Time Coverage**: {:.1}%\n",
        summary.date_time_coverage * 100.0
    ));
    md.push_str(&format!(
        "- **Location Coverage**: {:.1}%\n\n",
        summary.location_coverage * 100.0
    ));

    if !summary.by_origin.is_empty() {
        let rows: Vec<(String, usize)> = summary
            .by_origin
            .iter()
            .map(|(origin, count)| (origin.to_string(), *count))
            .collect();
        push_table(&mut md, "Events by Origin", "Origin", &rows);
    }

    push_table(&mut md, "Top Organizers", "Organizer", &summary.top_organizers);
    push_table(&mut md, "Top Locations", "Location", &summary.top_locations);
    push_table(&mut md, "Top Name Terms", "Term", &summary.top_terms);

    if !summary.keyword_hits.is_empty() {
        let rows: Vec<(String, usize)> = summary
            .keyword_hits
            .iter()
            .map(|(keyword, hits)| (keyword.clone(), *hits))
            .collect();
        push_table(&mut md, "Keyword Hits", "Keyword", &rows);
    }

    md
}
