//! Cleanup and shape validation for extracted values
//!
//! Every cleaner returns `None` when nothing usable is left, which makes the
//! fallback chain move on to its next strategy.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Hosts whose links count as an organizer's social profile
pub const SOCIAL_HOSTS: &[&str] = &[
    "x.com",
    "twitter.com",
    "instagram.com",
    "facebook.com",
    "linkedin.com",
    "youtube.com",
    "tiktok.com",
    "github.com",
    "discord.gg",
    "t.me",
    "telegram.me",
];

const MIN_FIELD_CHARS: usize = 2;
const MAX_FIELD_CHARS: usize = 100;
const MAX_NAME_CHARS: usize = 200;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static INVISIBLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").unwrap());

static REPEATED_DOTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{2,}").unwrap());

static TIMEZONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:GMT|UTC)\s*[+-]\s*\d{1,2}(?::?\d{2})?").unwrap());

static LOCATION_TAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)\b(?:hosted by|contact us:|email:|telegram|join our|explore events|sign (?:in|up)|report event|we're also)\b.*$",
    )
    .unwrap()
});

static ORGANIZER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:hosted|presented|organi[sz]ed)\s+by\s*:?\s*|^by\s+").unwrap()
});

static ORGANIZER_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)access support|linkedout \.").unwrap());

static NAME_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*[·|]\s*Luma\s*$").unwrap());

static DATE_WORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?|mon(?:day)?|tue(?:s(?:day)?)?|wed(?:nesday)?|thu(?:rs(?:day)?)?|fri(?:day)?|sat(?:urday)?|sun(?:day)?|today|tomorrow|yesterday)\b",
    )
    .unwrap()
});

static NUMERIC_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{4}[-/]\d{1,2}[-/]\d{1,2}|\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b").unwrap()
});

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b\d{1,2}:\d{2}\b|\b\d{1,2}\s*[ap]\.?m\b").unwrap());

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// Collapses runs of whitespace to single spaces and trims
pub fn collapse_whitespace(value: &str) -> String {
    WHITESPACE.replace_all(value.trim(), " ").into_owned()
}

fn within_bounds(value: String, max: usize) -> Option<String> {
    let len = value.chars().count();
    (MIN_FIELD_CHARS..=max).contains(&len).then_some(value)
}

fn strip_edges(value: &str) -> &str {
    value.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '|' | '·'))
}

pub fn clean_name(value: &str) -> Option<String> {
    let value = collapse_whitespace(&INVISIBLE.replace_all(value, ""));
    let value = NAME_SUFFIX.replace(&value, "");
    within_bounds(strip_edges(&value).to_string(), MAX_NAME_CHARS)
}

pub fn clean_location(value: &str) -> Option<String> {
    let value = INVISIBLE.replace_all(value, "");
    let value = LOCATION_TAIL.replace(&value, "");
    let value = REPEATED_DOTS.replace_all(&value, "");
    let value = collapse_whitespace(&value);
    within_bounds(strip_edges(&value).to_string(), MAX_FIELD_CHARS)
}

pub fn clean_organizer(value: &str) -> Option<String> {
    let value = collapse_whitespace(&INVISIBLE.replace_all(value, ""));
    let value = ORGANIZER_PREFIX.replace(&value, "");
    let value = ORGANIZER_NOISE.replace_all(&value, "");
    let value = REPEATED_DOTS.replace_all(&value, "");
    let value = collapse_whitespace(&value);
    within_bounds(strip_edges(&value).to_string(), MAX_FIELD_CHARS)
}

/// Strips timezone suffixes, then rejects values that do not look like a date or time
pub fn clean_date_time(value: &str) -> Option<String> {
    let value = TIMEZONE.replace_all(value, "");
    let value = collapse_whitespace(&value);
    let value = strip_edges(&value).to_string();

    if !is_plausible_date_time(&value) {
        tracing::trace!("Rejected date/time candidate '{}'", value);
        return None;
    }

    within_bounds(value, MAX_FIELD_CHARS)
}

/// Returns true if the text contains a month/weekday/relative-day word,
/// a numeric date, or a clock time
///
/// ```
/// use luma_events::extract::is_plausible_date_time;
///
/// assert!(is_plausible_date_time("Sunday, October 6 6:00 PM"));
/// assert!(!is_plausible_date_time("17 30"));
/// ```
pub fn is_plausible_date_time(value: &str) -> bool {
    DATE_WORD.is_match(value) || NUMERIC_DATE.is_match(value) || CLOCK_TIME.is_match(value)
}

pub fn clean_email(value: &str) -> Option<String> {
    let value = value.trim();
    let value = value.strip_prefix("mailto:").unwrap_or(value);
    let value = value.split('?').next().unwrap_or(value).trim();
    EMAIL.is_match(value).then(|| value.to_lowercase())
}

/// Accepts only absolute http(s) URLs on a known social host
pub fn clean_social_url(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let host = url.host_str()?.to_lowercase();
    is_social_host(&host).then(|| url.to_string())
}

/// Returns true for a social host or one of its subdomains
pub fn is_social_host(host: &str) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    SOCIAL_HOSTS
        .iter()
        .any(|social| host == *social || host.ends_with(&format!(".{}", social)))
}

/// Accepts any non-empty absolute http(s) URL
pub fn clean_url(value: &str) -> Option<String> {
    let url = Url::parse(value.trim()).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
