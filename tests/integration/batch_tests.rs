//! Batch coordination: ordering, failure isolation, dedup and deadlines

use crate::{event_page, listing_page, test_config, RoutedRenderer};
use luma_events::crawler::{Coordinator, Fetcher};
use luma_events::event::{ErrorKind, PageShape, SourceDescriptor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_page(server: &MockServer, page: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mixed_batch_keeps_order_and_isolates_failures() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/explore",
        listing_page(&[
            ("/tech-night", "Tech Night"),
            ("/pottery", "Pottery Workshop"),
            ("/techstars", "Techstars Demo Day"),
        ]),
    )
    .await;
    mount_page(&mock_server, "/abc123", event_page("Founders Dinner", "Angel Club")).await;

    let coordinator = Coordinator::new(test_config(&mock_server.uri())).unwrap();
    let run = coordinator
        .run(vec![
            SourceDescriptor::explore(vec!["tech".to_string()]),
            SourceDescriptor::custom_slug("abc123"),
            SourceDescriptor::city("unknownplace"),
        ])
        .await;

    assert_eq!(run.len(), 3);

    let explore = &run.entries[0];
    assert!(explore.is_ok());
    let names: Vec<_> = explore.records.iter().map(|r| r.display_name()).collect();
    assert_eq!(names, vec!["Tech Night", "Techstars Demo Day"]);

    let slug = &run.entries[1];
    assert!(slug.is_ok());
    assert_eq!(slug.records.len(), 1);
    assert_eq!(slug.records[0].organizer_name.as_deref(), Some("Angel Club"));

    let city = &run.entries[2];
    assert!(city.records.is_empty());
    assert_eq!(city.error.as_ref().map(|e| e.kind), Some(ErrorKind::UnknownCity));
}

#[tokio::test]
async fn test_fetch_failures_are_per_entry() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/one", event_page("One", "Org A")).await;
    mount_page(&mock_server, "/three", event_page("Three", "Org B")).await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/four"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let descriptors: Vec<_> = ["one", "two", "three", "four"]
        .iter()
        .map(|p| SourceDescriptor::generic(format!("{}/{}", base, p), PageShape::Single))
        .collect();

    let mut config = test_config(&base);
    config.batch.max_concurrency = 4;
    let run = Coordinator::new(config).unwrap().run(descriptors.clone()).await;

    assert_eq!(run.len(), 4);
    assert_eq!(run.failed_count(), 2);
    for (entry, descriptor) in run.entries.iter().zip(&descriptors) {
        assert_eq!(&entry.descriptor, descriptor);
    }
    assert_eq!(run.entries[0].records[0].display_name(), "One");
    assert_eq!(
        run.entries[1].error.as_ref().map(|e| e.kind),
        Some(ErrorKind::TerminalFetch)
    );
    assert_eq!(run.entries[2].records[0].display_name(), "Three");
    assert!(!run.entries[3].error.as_ref().unwrap().message.is_empty());
}

#[tokio::test]
async fn test_serial_and_concurrent_runs_match() {
    let mock_server = MockServer::start().await;

    for (page, name) in [("/a", "Alpha"), ("/b", "Bravo"), ("/c", "Charlie")] {
        mount_page(&mock_server, page, event_page(name, "Org")).await;
    }

    let base = mock_server.uri();
    let descriptors: Vec<_> = ["a", "b", "c", "missing"]
        .iter()
        .map(|p| SourceDescriptor::generic(format!("{}/{}", base, p), PageShape::Single))
        .collect();

    let mut serial = test_config(&base);
    serial.batch.max_concurrency = 1;
    let mut concurrent = test_config(&base);
    concurrent.batch.max_concurrency = 4;

    let serial_run = Coordinator::new(serial).unwrap().run(descriptors.clone()).await;
    let concurrent_run = Coordinator::new(concurrent).unwrap().run(descriptors).await;

    let summarize = |run: &luma_events::BatchRun| -> Vec<(Vec<String>, Option<ErrorKind>)> {
        run.entries
            .iter()
            .map(|e| {
                (
                    e.records.iter().map(|r| r.display_name().to_string()).collect(),
                    e.error.as_ref().map(|err| err.kind),
                )
            })
            .collect()
    };
    assert_eq!(summarize(&serial_run), summarize(&concurrent_run));
}

#[tokio::test]
async fn test_duplicates_across_entries_collapse_to_richest() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/explore",
        listing_page(&[("/shared?utm_source=explore", "Shared Event"), ("/solo", "Solo Event")]),
    )
    .await;
    mount_page(&mock_server, "/shared", event_page("Shared Event", "Shared Hosts")).await;

    let base = mock_server.uri();
    let coordinator = Coordinator::new(test_config(&base)).unwrap();
    let run = coordinator
        .run(vec![
            SourceDescriptor::explore(vec![]),
            SourceDescriptor::generic(format!("{}/shared", base), PageShape::Single),
        ])
        .await;

    let shared: Vec<_> = run
        .records()
        .filter(|r| r.source_url.ends_with("/shared"))
        .collect();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].organizer_name.as_deref(), Some("Shared Hosts"));

    let explore_urls: Vec<_> = run.entries[0]
        .records
        .iter()
        .map(|r| r.source_url.as_str())
        .collect();
    assert_eq!(explore_urls.len(), 1);
    assert!(explore_urls[0].ends_with("/solo"));
    assert_eq!(run.entries[1].records.len(), 1);
}

#[tokio::test]
async fn test_listing_cards_are_enriched_from_detail_pages() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/explore",
        listing_page(&[("/detail", "Card Name"), ("/gone", "Gone Event")]),
    )
    .await;
    mount_page(&mock_server, "/detail", event_page("Detail Name", "Detail Hosts")).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.batch.follow_detail_pages = true;

    let entry = Coordinator::new(config)
        .unwrap()
        .run_one(SourceDescriptor::explore(vec![]))
        .await;

    assert!(entry.is_ok());
    assert_eq!(entry.records.len(), 2);
    assert_eq!(entry.records[0].display_name(), "Detail Name");
    assert_eq!(entry.records[0].organizer_name.as_deref(), Some("Detail Hosts"));
    assert_eq!(entry.records[1].display_name(), "Gone Event");
}

/// Event page whose host links to an organizer profile
fn hosted_event_page(name: &str, profile: &str) -> String {
    event_page(name, "Chain Collective").replace(
        "<h1>",
        &format!(r#"<div class="hosts"><a href="{profile}">Chain Collective</a></div><h1>"#),
    )
}

#[tokio::test]
async fn test_organizer_profile_fills_social_link() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/meetup", hosted_event_page("Meetup", "/u/x")).await;
    Mock::given(method("GET"))
        .and(path("/u/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div class="profile"><a href="https://x.com/x">X</a></div></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    let run = Coordinator::new(test_config(&mock_server.uri()))
        .unwrap()
        .run(vec![SourceDescriptor::custom_slug("meetup")])
        .await;
    let entry = &run.entries[0];

    assert!(entry.is_ok());
    let record = &entry.records[0];
    assert!(record.organizer_profile_url.as_deref().unwrap().ends_with("/u/x"));
    assert_eq!(record.organizer_social_url.as_deref(), Some("https://x.com/x"));
}

#[tokio::test]
async fn test_failed_profile_keeps_record() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/meetup", hosted_event_page("Meetup", "/u/missing")).await;
    Mock::given(method("GET"))
        .and(path("/u/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let entry = Coordinator::new(test_config(&mock_server.uri()))
        .unwrap()
        .run_one(SourceDescriptor::custom_slug("meetup"))
        .await;

    assert!(entry.is_ok());
    assert_eq!(entry.records.len(), 1);
    assert_eq!(entry.records[0].display_name(), "Meetup");
    assert!(entry.records[0].organizer_profile_url.is_some());
    assert_eq!(entry.records[0].organizer_social_url, None);
}

#[tokio::test]
async fn test_profile_follow_up_can_be_disabled() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/meetup", hosted_event_page("Meetup", "/u/x")).await;
    Mock::given(method("GET"))
        .and(path("/u/x"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="https://x.com/x">X</a>"#.to_string(),
        ))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.batch.follow_profile_pages = false;

    let entry = Coordinator::new(config)
        .unwrap()
        .run_one(SourceDescriptor::custom_slug("meetup"))
        .await;

    assert!(entry.is_ok());
    assert_eq!(entry.records[0].organizer_social_url, None);
}

#[tokio::test]
async fn test_render_hint_carries_within_a_pipeline() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/explore"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rendered"))
        .respond_with(ResponseTemplate::new(200).set_body_string(event_page("Http", "Ops")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.fetcher.min_body_bytes = 100;
    config.batch.follow_detail_pages = true;

    let renderer = Arc::new(RoutedRenderer {
        routes: vec![
            ("/explore", listing_page(&[("/rendered", "Rendered Card")])),
            ("/rendered", event_page("Rendered Detail", "Render Hosts")),
        ],
        calls: AtomicUsize::new(0),
    });
    let fetcher = Fetcher::from_config(&config)
        .unwrap()
        .with_renderer(renderer.clone());
    let coordinator = Coordinator::with_fetcher(config, fetcher).unwrap();

    let entry = coordinator.run_one(SourceDescriptor::explore(vec![])).await;

    // listing fetched over HTTP then rendered, detail page rendered directly
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
    assert_eq!(entry.records.len(), 1);
    assert_eq!(entry.records[0].display_name(), "Rendered Detail");
    assert_eq!(entry.records[0].organizer_name.as_deref(), Some("Render Hosts"));
}

#[tokio::test]
async fn test_run_deadline_marks_unfinished_entries() {
    let mock_server = MockServer::start().await;

    mount_page(&mock_server, "/fast", event_page("Fast", "Org")).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(event_page("Slow", "Org"))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let base = mock_server.uri();
    let mut config = test_config(&base);
    config.batch.max_concurrency = 2;

    let coordinator = Coordinator::new(config).unwrap();
    let run = coordinator
        .run_with_timeout(
            vec![
                SourceDescriptor::generic(format!("{}/fast", base), PageShape::Single),
                SourceDescriptor::generic(format!("{}/slow", base), PageShape::Single),
            ],
            Duration::from_millis(500),
        )
        .await;

    assert_eq!(run.len(), 2);
    assert!(run.entries[0].is_ok());
    assert_eq!(run.entries[0].records[0].display_name(), "Fast");
    assert_eq!(
        run.entries[1].error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Timeout)
    );
}
