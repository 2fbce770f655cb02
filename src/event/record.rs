//! Canonical event record produced by the field extractor
//!
//! Every text field other than `source_url` is optional; an absent field is
//! `None`, never an empty string and never a different record shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Sentinel shown in place of an absent event name
pub const UNKNOWN_NAME: &str = "unknown";

/// Which resolver path produced a record
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Explore,
    CustomSlug,
    City,
    #[default]
    BatchItem,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explore => "explore",
            Self::CustomSlug => "custom_slug",
            Self::City => "city",
            Self::BatchItem => "batch_item",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "explore" => Some(Self::Explore),
            "custom_slug" => Some(Self::CustomSlug),
            "city" => Some(Self::City),
            "batch_item" => Some(Self::BatchItem),
            _ => None,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(default, alias = "event_name", deserialize_with = "absent_name")]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "absent_sentinel")]
    pub date_time: Option<String>,

    #[serde(default, deserialize_with = "absent_sentinel")]
    pub location: Option<String>,

    #[serde(default, deserialize_with = "absent_sentinel")]
    pub organizer_name: Option<String>,

    #[serde(
        default,
        alias = "host_social_media",
        deserialize_with = "absent_sentinel"
    )]
    pub organizer_social_url: Option<String>,

    /// Organizer profile page on the events platform
    #[serde(
        default,
        alias = "organizer_contact",
        deserialize_with = "absent_sentinel"
    )]
    pub organizer_profile_url: Option<String>,

    #[serde(default, deserialize_with = "absent_sentinel")]
    pub host_email: Option<String>,

    /// Canonical URL of the page the record came from; the dedup key
    #[serde(alias = "event_url")]
    pub source_url: String,

    #[serde(default)]
    origin: Origin,

    #[serde(default = "Utc::now")]
    pub fetched_at: DateTime<Utc>,
}

impl EventRecord {
    /// Creates a record with every optional field absent
    pub fn new(source_url: impl Into<String>, origin: Origin) -> Self {
        Self {
            name: None,
            date_time: None,
            location: None,
            organizer_name: None,
            organizer_social_url: None,
            organizer_profile_url: None,
            host_email: None,
            source_url: source_url.into(),
            origin,
            fetched_at: Utc::now(),
        }
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Event name, or the `"unknown"` sentinel when absent
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_NAME)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_date_time(mut self, date_time: impl Into<String>) -> Self {
        self.date_time = Some(date_time.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_organizer(mut self, organizer: impl Into<String>) -> Self {
        self.organizer_name = Some(organizer.into());
        self
    }

    pub fn with_fetched_at(mut self, fetched_at: DateTime<Utc>) -> Self {
        self.fetched_at = fetched_at;
        self
    }

    fn optional_fields(&self) -> [&Option<String>; 7] {
        [
            &self.name,
            &self.date_time,
            &self.location,
            &self.organizer_name,
            &self.organizer_social_url,
            &self.organizer_profile_url,
            &self.host_email,
        ]
    }

    /// Number of optional fields that are present
    pub fn richness(&self) -> usize {
        self.optional_fields()
            .iter()
            .filter(|field| field.is_some())
            .count()
    }

    /// Returns true if no optional field could be extracted
    pub fn is_empty(&self) -> bool {
        self.richness() == 0
    }

    /// Fills every absent field from `other`, keeping fields already present
    pub fn fill_missing_from(&mut self, other: &EventRecord) {
        fn fill(target: &mut Option<String>, source: &Option<String>) {
            if target.is_none() {
                target.clone_from(source);
            }
        }

        fill(&mut self.name, &other.name);
        fill(&mut self.date_time, &other.date_time);
        fill(&mut self.location, &other.location);
        fill(&mut self.organizer_name, &other.organizer_name);
        fill(&mut self.organizer_social_url, &other.organizer_social_url);
        fill(&mut self.organizer_profile_url, &other.organizer_profile_url);
        fill(&mut self.host_email, &other.host_email);
    }

    /// Lowercased name, location and organizer, used for keyword matching
    pub fn searchable_text(&self) -> String {
        [&self.name, &self.location, &self.organizer_name]
            .iter()
            .filter_map(|field| field.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

/// Trims a stored value, mapping `""` and `"N/A"` to `None`
pub fn absent_value(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`absent_value`], also dropping the `"unknown"` name placeholder
pub fn absent_name_value(raw: &str) -> Option<String> {
    absent_value(raw).filter(|name| name != UNKNOWN_NAME)
}

fn absent_sentinel<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(absent_value))
}

fn absent_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.as_deref().and_then(absent_name_value))
}
