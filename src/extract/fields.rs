//! Per-field fallback chains
//!
//! Event pages get the full chains (structured data, OpenGraph, CSS, text
//! patterns). Listing cards only carry a handful of fields, so their chains
//! are shorter and never look outside the card.

use crate::event::{EventRecord, Origin};
use crate::extract::chain::{FieldChain, Scope};
use crate::extract::clean::{
    clean_date_time, clean_email, clean_location, clean_name, clean_organizer, clean_social_url,
    clean_url,
};
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:mon|tue|wed|thu|fri|sat|sun)[a-z]*,?\s+)?(?:\d{1,2}(?:st|nd|rd|th)?\s+(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+\d{1,2}(?:st|nd|rd|th)?)(?:,?\s+\d{4})?\b|\b\d{4}[-/]\d{1,2}[-/]\d{1,2}\b|\b(?:today|tomorrow)\b",
    )
    .unwrap()
});

static TIME_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}(?::\d{2})?\s*[ap]m(?:\s*[-–—]\s*\d{1,2}(?::\d{2})?\s*[ap]m)?\b|\b\d{1,2}:\d{2}(?:\s*[-–—]\s*\d{1,2}:\d{2})?\b",
    )
    .unwrap()
});

static LOCATION_PIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"📍\s*([^\n]+)").unwrap());

static LOCATION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(?:venue|location|where|address)\s*:\s*([^\n]+)").unwrap());

static ONLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:online|virtual|zoom|google meet|microsoft teams|webinar)\b").unwrap()
});

static HOSTED_BY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:hosted|presented|organi[sz]ed)\s+by\s*:?\s*([^,\n]{2,50})").unwrap()
});

static CARD_BY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*by\s+([^,\n]{2,50})").unwrap());

static EMAIL_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());

const REGISTRATION_REQUIRED: &str = "Registration required";

/// The set of chains used to build one record
pub struct RecordChains {
    name: FieldChain,
    date_time: FieldChain,
    location: FieldChain,
    organizer_name: FieldChain,
    organizer_profile_url: FieldChain,
    organizer_social_url: Option<FieldChain>,
    host_email: Option<FieldChain>,
}

impl RecordChains {
    /// Evaluates every chain against `scope`; exhausted chains leave the field absent
    pub fn build_record(&self, scope: &Scope, source_url: &str, origin: Origin) -> EventRecord {
        let mut record = EventRecord::new(source_url, origin);
        record.name = self.name.evaluate(scope);
        record.date_time = self.date_time.evaluate(scope);
        record.location = self.location.evaluate(scope);
        record.organizer_name = self.organizer_name.evaluate(scope);
        record.organizer_profile_url = self.organizer_profile_url.evaluate(scope);
        record.organizer_social_url = self
            .organizer_social_url
            .as_ref()
            .and_then(|chain| chain.evaluate(scope));
        record.host_email = self.host_email.as_ref().and_then(|chain| chain.evaluate(scope));
        record
    }
}

/// Chains for a whole event page
pub static EVENT_PAGE: Lazy<RecordChains> = Lazy::new(|| RecordChains {
    name: FieldChain::new("name", clean_name)
        .json_ld(&["name"])
        .attr(r#"meta[property="og:title"]"#, "content")
        .text(r#"h1[data-testid="event-title"]"#)
        .text("h1.event-title")
        .text("h1.title")
        .text("h1")
        .text(r#"[data-testid="event-name"]"#)
        .text(r#"[class*="title"]"#),

    date_time: FieldChain::new("date_time", clean_date_time)
        .json_ld(&["startDate"])
        .attr("time[datetime]", "datetime")
        .custom(date_and_time_from_text)
        .text(r#"[data-testid="event-date"]"#)
        .text(".event-date")
        .text(r#"[class*="date"]"#)
        .text(r#"[class*="time"]"#),

    location: FieldChain::new("location", clean_location)
        .json_ld(&["location", "name"])
        .json_ld(&["location", "address", "streetAddress"])
        .custom(registration_required)
        .text(r#"[data-testid="event-location"]"#)
        .text(".event-location")
        .text(".location")
        .text(r#"[class*="location"]"#)
        .text(r#"[class*="venue"]"#)
        .text(r#"[class*="address"]"#)
        .capture(&LOCATION_PIN)
        .capture(&LOCATION_LABEL)
        .pattern(&ONLINE),

    organizer_name: FieldChain::new("organizer_name", clean_organizer)
        .json_ld(&["organizer", "name"])
        .text(r#"[data-testid="organizer-name"]"#)
        .text(".organizer-name")
        .text(".organizer")
        .text(r#"a[href*="/u/"]"#)
        .text(r#"[class*="organizer"]"#)
        .text(r#"[class*="host"]"#)
        .capture(&HOSTED_BY),

    organizer_profile_url: FieldChain::new("organizer_profile_url", clean_url)
        .link(r#"a[href*="/u/"]"#)
        .json_ld(&["organizer", "url"]),

    organizer_social_url: Some(
        FieldChain::new("organizer_social_url", clean_social_url)
            .social_link(r#"[class*="social-link"] a[href]"#)
            .social_link(
                r#"[class*="host"] a[href], [class*="organizer"] a[href], [class*="creator"] a[href], [data-testid*="host"] a[href], [data-testid*="organizer"] a[href]"#,
            )
            .json_ld(&["organizer", "sameAs"])
            .social_link("a[href]"),
    ),

    host_email: Some(
        FieldChain::new("host_email", clean_email)
            .attr(r#"a[href^="mailto:"]"#, "href")
            .pattern(&EMAIL_TEXT),
    ),
});

/// Chains for one listing card
pub static LISTING_CARD: Lazy<RecordChains> = Lazy::new(|| RecordChains {
    name: FieldChain::new("name", clean_name)
        .text(r#"[data-testid="event-name"]"#)
        .text("h3")
        .text("h2")
        .text(r#"[class*="title"]"#)
        .text(r#"[class*="name"]"#)
        .attr("a[aria-label]", "aria-label"),

    date_time: FieldChain::new("date_time", clean_date_time)
        .attr("time[datetime]", "datetime")
        .custom(date_and_time_from_text)
        .text(r#"[class*="date"]"#)
        .text(r#"[class*="time"]"#),

    location: FieldChain::new("location", clean_location)
        .text(r#"[class*="location"]"#)
        .text(r#"[class*="venue"]"#)
        .text(r#"[class*="address"]"#)
        .capture(&LOCATION_PIN)
        .pattern(&ONLINE),

    organizer_name: FieldChain::new("organizer_name", clean_organizer)
        .text(r#"[class*="host"]"#)
        .text(r#"[class*="organizer"]"#)
        .capture(&CARD_BY_LINE),

    organizer_profile_url: FieldChain::new("organizer_profile_url", clean_url)
        .link(r#"a[href*="/u/"]"#),

    organizer_social_url: None,
    host_email: None,
});

/// Social links on an organizer's profile page
pub static PROFILE_SOCIAL: Lazy<FieldChain> = Lazy::new(|| {
    FieldChain::new("organizer_social_url", clean_social_url)
        .social_link(r#"[class*="social"] a[href]"#)
        .social_link(r#"[class*="profile"] a[href]"#)
        .social_link("a[href]")
});

/// First date phrase and first time phrase in the text, joined
fn date_and_time_from_text(scope: &Scope) -> Option<String> {
    let date = DATE_TEXT.find(&scope.text).map(|m| m.as_str());
    let time = TIME_TEXT.find(&scope.text).map(|m| m.as_str());

    match (date, time) {
        (Some(date), Some(time)) => Some(format!("{} {}", date, time)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// Events that hide their venue until registration
fn registration_required(scope: &Scope) -> Option<String> {
    let lowered = scope.text.to_lowercase();
    (lowered.contains("register to see address") || lowered.contains("register to see location"))
        .then(|| REGISTRATION_REQUIRED.to_string())
}
