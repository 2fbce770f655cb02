//! Listing pages: repeated event cards
//!
//! Cards are located with an ordered list of container selectors; when none
//! match, bare event links are treated as cards. Each card is extracted on
//! its own, and a card without a usable event link is skipped and counted.

use crate::event::Origin;
use crate::extract::chain::Scope;
use crate::extract::clean::is_social_host;
use crate::extract::fields::LISTING_CARD;
use crate::extract::Extraction;
use crate::source::resolve_href;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[
        r#"[data-testid="event-card"]"#,
        ".event-card",
        r#"[class*="event-card"]"#,
    ])
});

static EVENT_LINK_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    parse_all(&[r#"a[href*="/event/"]"#, r#"a[href*="/e/"]"#, "a.event-link"])
});

static ANCHOR: Lazy<Vec<Selector>> = Lazy::new(|| parse_all(&["a[href]"]));

fn parse_all(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|css| match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::error!("Invalid listing selector '{}': {:?}", css, e);
                None
            }
        })
        .collect()
}

/// Extracts one record per card on a listing page
pub fn extract_listing(document: &Html, page_url: &Url, origin: Origin) -> Extraction {
    let cards = find_cards(document);
    let mut extraction = Extraction::default();

    for (position, card) in cards.into_iter().enumerate() {
        let Some(link) = event_link(card, page_url) else {
            extraction.skipped += 1;
            tracing::warn!(
                "ExtractionAnomaly: listing entry {} on {} has no event link, skipped",
                position,
                page_url
            );
            continue;
        };

        let scope = Scope::new(card, None, page_url);
        let record = LISTING_CARD.build_record(&scope, link.as_str(), origin);
        extraction.records.push(record);
    }

    tracing::debug!(
        "Listing {} yielded {} record(s), {} skipped",
        page_url,
        extraction.records.len(),
        extraction.skipped
    );
    extraction
}

/// Outermost elements matched by the first container selector that matches
/// anything, or event links when no container selector does
fn find_cards(document: &Html) -> Vec<ElementRef<'_>> {
    CONTAINER_SELECTORS
        .iter()
        .chain(EVENT_LINK_SELECTORS.iter())
        .map(|selector| outermost(document.select(selector)))
        .find(|cards| !cards.is_empty())
        .unwrap_or_default()
}

/// Drops matches nested inside an earlier match
fn outermost<'a>(matches: impl Iterator<Item = ElementRef<'a>>) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut cards = Vec::new();

    for element in matches {
        let nested = element.ancestors().any(|ancestor| seen.contains(&ancestor.id()));
        seen.insert(element.id());
        if !nested {
            cards.push(element);
        }
    }

    cards
}

/// The card itself when it is a link, otherwise its first usable link
fn event_link(card: ElementRef, page_url: &Url) -> Option<Url> {
    if card.value().name() == "a" {
        if let Some(url) = card.value().attr("href").and_then(|href| usable_link(href, page_url)) {
            return Some(url);
        }
    }

    ANCHOR.iter().find_map(|selector| {
        card.select(selector)
            .filter_map(|a| a.value().attr("href"))
            .find_map(|href| usable_link(href, page_url))
    })
}

/// Resolves an href that can point at an event page
///
/// Excluded: fragments, non-HTTP schemes, profile pages (`/u/`), social hosts
/// and the listing page itself.
fn usable_link(href: &str, page_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let url = resolve_href(page_url, href).ok()?;
    let host = url.host_str()?;
    if is_social_host(host) || url.path().starts_with("/u/") || url.path() == "/" {
        return None;
    }

    let same_page = url.host_str() == page_url.host_str() && url.path() == page_url.path();
    (!same_page).then_some(url)
}
