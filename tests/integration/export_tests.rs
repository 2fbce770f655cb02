//! Export round-trips through files, as the CLI does them

use luma_events::output::{deserialize, serialize, stats};
use luma_events::{EventRecord, ExportFormat, Origin};
use tempfile::TempDir;

fn records() -> Vec<EventRecord> {
    let mut with_contacts = EventRecord::new("https://lu.ma/ai-night", Origin::City)
        .with_name("AI Night, Vol. 2")
        .with_date_time("Sat, 12 Oct 18:00")
        .with_location("Koramangala, Bengaluru")
        .with_organizer("AI Collective");
    with_contacts.organizer_social_url = Some("https://x.com/aicollective".to_string());
    with_contacts.host_email = Some("hello@aicollective.org".to_string());

    vec![
        with_contacts,
        EventRecord::new("https://lu.ma/quiet", Origin::Explore).with_organizer("AI Collective"),
        EventRecord::new("https://lu.ma/empty", Origin::BatchItem),
    ]
}

#[test]
fn test_csv_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.csv");
    let original = records();

    std::fs::write(&path, serialize(&original, ExportFormat::Csv).unwrap()).unwrap();
    let parsed = deserialize(&std::fs::read(&path).unwrap(), ExportFormat::Csv).unwrap();

    assert_eq!(parsed.len(), original.len());
    for (before, after) in original.iter().zip(&parsed) {
        assert_eq!(before.name, after.name);
        assert_eq!(before.date_time, after.date_time);
        assert_eq!(before.location, after.location);
        assert_eq!(before.organizer_name, after.organizer_name);
        assert_eq!(before.organizer_social_url, after.organizer_social_url);
        assert_eq!(before.host_email, after.host_email);
        assert_eq!(before.source_url, after.source_url);
        assert_eq!(before.origin(), after.origin());
        assert_eq!(before.fetched_at, after.fetched_at);
    }
}

#[test]
fn test_json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.json");
    let original = records();

    std::fs::write(&path, serialize(&original, ExportFormat::Json).unwrap()).unwrap();
    let parsed = deserialize(&std::fs::read(&path).unwrap(), ExportFormat::Json).unwrap();

    assert_eq!(parsed, original);
}

#[test]
fn test_stats_over_exported_records() {
    let bytes = serialize(&records(), ExportFormat::Csv).unwrap();
    let parsed = deserialize(&bytes, ExportFormat::Csv).unwrap();

    let summary = stats(&parsed);
    assert_eq!(summary.total_events, 3);
    assert_eq!(summary.distinct_organizer_count, 1);
    assert_eq!(summary.top_organizers[0], ("AI Collective".to_string(), 2));
}
