//! Fetcher strategy selection and retry policy

use crate::{event_page, test_config, CrashingRenderer, StubRenderer};
use luma_events::crawler::{FetchStrategy, Fetcher};
use luma_events::FetchError;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_transient_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string(event_page("Flaky", "Ops")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/flaky", mock_server.uri()), false)
        .await;

    assert!(result.ok(), "unexpected error: {:?}", result.error);
    assert_eq!(result.attempt_count, 3);
    assert_eq!(result.strategy_used, FetchStrategy::Http);
    assert!(result.raw_content.unwrap().contains("Flaky"));
}

#[tokio::test]
async fn test_retries_are_bounded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/down", mock_server.uri()), false)
        .await;

    assert!(!result.ok());
    assert_eq!(result.attempt_count, 3);
    assert!(matches!(result.error, Some(FetchError::Transient { .. })));
}

#[tokio::test]
async fn test_not_found_is_terminal() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()), false)
        .await;

    assert_eq!(result.attempt_count, 1);
    match result.error {
        Some(FetchError::Terminal { status, .. }) => assert_eq!(status, Some(404)),
        other => panic!("expected terminal error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limit_is_transient() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(event_page("Busy", "Ops")))
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/busy", mock_server.uri()), false)
        .await;

    assert!(result.ok());
    assert_eq!(result.attempt_count, 2);
}

#[tokio::test]
async fn test_thin_page_falls_back_to_renderer_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spa"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"<html><body><div id="root"></div></body></html>"#),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.fetcher.min_body_bytes = 200;
    config.fetcher.min_text_chars = 20;

    let renderer = Arc::new(StubRenderer::new(event_page("Rendered Event", "Hosts")));
    let fetcher = Fetcher::from_config(&config)
        .unwrap()
        .with_renderer(renderer.clone());

    let result = fetcher
        .fetch(&format!("{}/spa", mock_server.uri()), false)
        .await;

    assert!(result.ok());
    assert!(result.render_signalled);
    assert_eq!(result.strategy_used, FetchStrategy::Render);
    assert_eq!(result.attempt_count, 2);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
    assert!(result.raw_content.unwrap().contains("Rendered Event"));
}

#[tokio::test]
async fn test_thin_page_without_renderer_is_returned() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/spa"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.fetcher.min_body_bytes = 200;

    let fetcher = Fetcher::from_config(&config).unwrap();
    let result = fetcher
        .fetch(&format!("{}/spa", mock_server.uri()), false)
        .await;

    assert!(result.ok());
    assert!(result.render_signalled);
    assert_eq!(result.strategy_used, FetchStrategy::Http);
}

#[tokio::test]
async fn test_prefer_rendering_skips_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(event_page("Http", "Ops")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = test_config(&mock_server.uri());
    let renderer = Arc::new(StubRenderer::new(event_page("Browser", "Ops")));
    let fetcher = Fetcher::from_config(&config)
        .unwrap()
        .with_renderer(renderer.clone());

    let result = fetcher
        .fetch(&format!("{}/page", mock_server.uri()), true)
        .await;

    assert!(result.ok());
    assert_eq!(result.strategy_used, FetchStrategy::Render);
    assert_eq!(result.attempt_count, 1);
}

#[tokio::test]
async fn test_crashing_renderer_degrades_to_rendering_unavailable() {
    let mock_server = MockServer::start().await;

    let config = test_config(&mock_server.uri());
    let fetcher = Fetcher::from_config(&config)
        .unwrap()
        .with_renderer(Arc::new(CrashingRenderer));

    let result = fetcher
        .fetch(&format!("{}/page", mock_server.uri()), true)
        .await;

    assert!(!result.ok());
    assert_eq!(result.attempt_count, 3);
    assert!(matches!(
        result.error,
        Some(FetchError::RenderingUnavailable { .. })
    ));
}
