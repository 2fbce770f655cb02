//! Integration tests for Luma-Events
//!
//! These tests use wiremock to serve listing and event pages and exercise the
//! fetcher, the batch coordinator and the exporters end-to-end.

mod batch_tests;
mod export_tests;
mod fetch_tests;

use async_trait::async_trait;
use luma_events::config::Config;
use luma_events::crawler::{RenderError, Renderer};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Configuration pointed at a mock server, with no pacing and no browser
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.source.base_url = base_url.to_string();
    config.render.enabled = false;
    config.fetcher.retry_backoff_ms = 10;
    config.fetcher.min_body_bytes = 0;
    config.fetcher.min_text_chars = 0;
    config.batch.pacing_ms = 0;
    config.batch.follow_detail_pages = false;
    config
}

/// Event page carrying its details as JSON-LD
pub fn event_page(name: &str, organizer: &str) -> String {
    format!(
        r#"<html><head>
        <script type="application/ld+json">
        {{"@context": "https://schema.org", "@type": "Event",
          "name": "{name}",
          "startDate": "2024-11-02T18:30:00+05:30",
          "location": {{"@type": "Place", "name": "Indiranagar Social"}},
          "organizer": {{"@type": "Organization", "name": "{organizer}"}}}}
        </script></head>
        <body><h1>{name}</h1><p>Hosted by {organizer}</p></body></html>"#
    )
}

/// Listing page with one card per `(path, name)`
pub fn listing_page(cards: &[(&str, &str)]) -> String {
    let cards: Vec<String> = cards
        .iter()
        .map(|(path, name)| {
            format!(
                r#"<div data-testid="event-card">
                     <a href="{path}"><h3>{name}</h3></a>
                     <div>Tomorrow 6:00 PM</div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body><main>{}</main></body></html>", cards.join("\n"))
}

/// Renderer returning fixed markup
pub struct StubRenderer {
    pub html: String,
    pub calls: AtomicUsize,
}

impl StubRenderer {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn render(&self, _url: &str) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }
}

/// Renderer whose browser crashes every time
pub struct CrashingRenderer;

#[async_trait]
impl Renderer for CrashingRenderer {
    async fn render(&self, _url: &str) -> Result<String, RenderError> {
        Err(RenderError::Crashed("exit status 134".to_string()))
    }
}

/// Renderer serving markup by URL path suffix
pub struct RoutedRenderer {
    pub routes: Vec<(&'static str, String)>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl Renderer for RoutedRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.routes
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix))
            .map(|(_, html)| html.clone())
            .ok_or_else(|| RenderError::Unavailable(format!("no route for {}", url)))
    }
}
