//! Field Extractor
//!
//! Turns raw page markup into [`EventRecord`] values. Extraction is a pure,
//! synchronous transformation: it never fetches and never fails. Fields that
//! cannot be found are absent; listing cards without an event link are
//! skipped and counted.

mod chain;
mod clean;
mod fields;
mod filter;
mod listing;

pub use chain::{FieldChain, Scope, Strategy};
pub use clean::{collapse_whitespace, is_plausible_date_time, is_social_host};
pub use filter::{filter_by_keywords, matches_keywords};

use crate::event::{EventRecord, Origin, PageShape};
use crate::source::normalize_url;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

static JSON_LD: Lazy<Option<Selector>> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).ok());

/// Records found on one page
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<EventRecord>,

    /// Listing occurrences skipped as malformed
    pub skipped: usize,
}

/// Extracts event records from a fetched page
///
/// # Arguments
///
/// * `raw` - Page markup
/// * `page_url` - URL the markup was served from; relative links resolve against it
/// * `shape` - Whether the page is one event or a listing
/// * `origin` - Stamped on every record produced
///
/// # Returns
///
/// For `Single`, one record, or none when no field at all could be found.
/// For `Listing`, one record per well-formed card (possibly none).
pub fn extract(raw: &str, page_url: &Url, shape: PageShape, origin: Origin) -> Extraction {
    let document = Html::parse_document(raw);

    match shape {
        PageShape::Listing => listing::extract_listing(&document, page_url, origin),
        PageShape::Single => {
            let record = extract_single(&document, page_url, origin);
            Extraction {
                records: (!record.is_empty()).then_some(record).into_iter().collect(),
                skipped: 0,
            }
        }
    }
}

fn extract_single(document: &Html, page_url: &Url, origin: Origin) -> EventRecord {
    let structured = structured_event(document);
    let scope = Scope::new(document.root_element(), structured.as_ref(), page_url);
    let source_url = normalize_url(page_url.as_str())
        .map(|url| url.to_string())
        .unwrap_or_else(|_| page_url.to_string());

    fields::EVENT_PAGE.build_record(&scope, &source_url, origin)
}

/// First social link on an organizer's profile page
pub fn extract_profile_social(raw: &str, page_url: &Url) -> Option<String> {
    let document = Html::parse_document(raw);
    let scope = Scope::new(document.root_element(), None, page_url);
    fields::PROFILE_SOCIAL.evaluate(&scope)
}

/// First JSON-LD object on the page whose `@type` names an event
fn structured_event(document: &Html) -> Option<Value> {
    let selector = JSON_LD.as_ref()?;

    document
        .select(selector)
        .filter_map(|script| {
            let text: String = script.text().collect();
            match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!("Ignoring unparsable JSON-LD block: {}", e);
                    None
                }
            }
        })
        .find_map(find_event)
}

fn find_event(value: Value) -> Option<Value> {
    match value {
        Value::Array(items) => items.into_iter().find_map(find_event),
        Value::Object(mut map) => {
            if is_event_type(map.get("@type")) {
                return Some(Value::Object(map));
            }
            map.remove("@graph").and_then(find_event)
        }
        _ => None,
    }
}

fn is_event_type(value: Option<&Value>) -> bool {
    match value {
        Some(Value::String(kind)) => kind.ends_with("Event"),
        Some(Value::Array(kinds)) => kinds
            .iter()
            .any(|kind| kind.as_str().map_or(false, |k| k.ends_with("Event"))),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_single_page_from_json_ld() {
        let html = r#"<html><head>
            <script type="application/ld+json">
            {"@context": "https://schema.org", "@type": "SocialEvent",
             "name": "Web3 Builders Night",
             "startDate": "2024-10-06T18:00:00.000+05:30",
             "location": {"@type": "Place", "name": "91springboard, Koramangala"},
             "organizer": [{"@type": "Organization", "name": "Chain Collective",
                            "sameAs": ["https://x.com/chaincollective"]}]}
            </script></head><body><div id="root"></div></body></html>"#;

        let extraction = extract(
            html,
            &url("https://lu.ma/web3-night?utm_source=share"),
            PageShape::Single,
            Origin::CustomSlug,
        );

        assert_eq!(extraction.records.len(), 1);
        let record = &extraction.records[0];
        assert_eq!(record.name.as_deref(), Some("Web3 Builders Night"));
        assert_eq!(
            record.date_time.as_deref(),
            Some("2024-10-06T18:00:00.000+05:30")
        );
        assert_eq!(record.location.as_deref(), Some("91springboard, Koramangala"));
        assert_eq!(record.organizer_name.as_deref(), Some("Chain Collective"));
        assert_eq!(
            record.organizer_social_url.as_deref(),
            Some("https://x.com/chaincollective")
        );
        assert_eq!(record.source_url, "https://lu.ma/web3-night");
    }

    #[test]
    fn test_profile_social_link() {
        let html = r#"<html><body>
            <h1>Chain Collective</h1>
            <a href="/explore">Explore</a>
            <a href="/u/someone-else">Co-host</a>
            <div class="profile-links">
              <a href="https://twitter.com/chaincollective">Twitter</a>
            </div>
        </body></html>"#;

        assert_eq!(
            extract_profile_social(html, &url("https://lu.ma/u/chain")),
            Some("https://twitter.com/chaincollective".to_string())
        );
        assert_eq!(
            extract_profile_social("<html><body><p>No links</p></body></html>", &url("https://lu.ma/u/x")),
            None
        );
    }

    #[test]
    fn test_json_ld_in_graph() {
        let value = serde_json::json!({
            "@graph": [{"@type": "WebPage"}, {"@type": "Event", "name": "Inner"}]
        });
        let event = find_event(value).unwrap();
        assert_eq!(event["name"], "Inner");
    }

    #[test]
    fn test_single_page_with_nothing_is_empty() {
        let extraction = extract(
            "<html><body><div id=\"app\"></div></body></html>",
            &url("https://lu.ma/abc123"),
            PageShape::Single,
            Origin::CustomSlug,
        );
        assert!(extraction.records.is_empty());
    }

    #[test]
    fn test_listing_shape_dispatch() {
        let html = r#"<html><body>
            <div class="event-card"><a href="/a1"><h3>First Event</h3></a></div>
            <div class="event-card"><a href="/a2"><h3>Second Event</h3></a></div>
        </body></html>"#;

        let extraction = extract(html, &url("https://lu.ma/pune"), PageShape::Listing, Origin::City);
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.records[1].source_url, "https://lu.ma/a2");
    }
}
