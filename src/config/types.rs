use crate::crawler::FetchStrategy;
use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure for Luma-Events
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fetcher: FetcherConfig,
    pub render: RenderConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub source: SourceConfig,
    pub batch: BatchConfig,
}

/// HTTP fetching and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Strategy tried first when the caller expresses no preference
    #[serde(rename = "default-strategy")]
    pub default_strategy: FetchStrategy,

    #[serde(rename = "request-timeout-secs")]
    pub request_timeout_secs: u64,

    #[serde(rename = "connect-timeout-secs")]
    pub connect_timeout_secs: u64,

    /// Retries after the first attempt, per strategy, for transient failures
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    #[serde(rename = "retry-backoff-ms")]
    pub retry_backoff_ms: u64,

    /// Bodies shorter than this signal that rendering is required
    #[serde(rename = "min-body-bytes")]
    pub min_body_bytes: usize,

    /// Pages with less visible text than this signal that rendering is required
    #[serde(rename = "min-text-chars")]
    pub min_text_chars: usize,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            default_strategy: FetchStrategy::Http,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 1000,
            min_body_bytes: 1024,
            min_text_chars: 64,
        }
    }
}

/// Headless browser rendering
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub enabled: bool,

    /// Explicit browser binary; well-known names are probed on PATH otherwise
    #[serde(rename = "browser-path")]
    pub browser_path: Option<PathBuf>,

    #[serde(rename = "page-timeout-secs")]
    pub page_timeout_secs: u64,

    /// Virtual time the browser waits for scripts before dumping the DOM
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    /// Maximum browser processes alive at once
    #[serde(rename = "max-sessions")]
    pub max_sessions: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            browser_path: None,
            page_timeout_secs: 30,
            settle_ms: 2000,
            max_sessions: 1,
        }
    }
}

/// Request identification headers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    pub value: String,

    #[serde(rename = "accept-language")]
    pub accept_language: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            value: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                    (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            accept_language: "en-US,en;q=0.5".to_string(),
        }
    }
}

/// Where descriptors resolve to
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    #[serde(rename = "base-url")]
    pub base_url: String,

    #[serde(rename = "explore-path")]
    pub explore_path: String,

    /// Extra or overriding entries for the city table
    #[serde(rename = "city")]
    pub cities: Vec<CityEntry>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://lu.ma".to_string(),
            explore_path: "/explore".to_string(),
            cities: Vec::new(),
        }
    }
}

/// City name to listing slug mapping
#[derive(Debug, Clone, Deserialize)]
pub struct CityEntry {
    pub name: String,

    pub slug: String,

    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Orchestration limits
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Descriptors processed at once
    #[serde(rename = "max-concurrency")]
    pub max_concurrency: usize,

    /// Deadline for a whole run
    #[serde(rename = "run-timeout-secs")]
    pub run_timeout_secs: u64,

    /// Minimum spacing between requests within one descriptor pipeline
    #[serde(rename = "pacing-ms")]
    pub pacing_ms: u64,

    #[serde(rename = "follow-detail-pages")]
    pub follow_detail_pages: bool,

    /// Fetch organizer profile pages to find a missing social link
    #[serde(rename = "follow-profile-pages")]
    pub follow_profile_pages: bool,

    /// Listing records enriched from their detail page
    #[serde(rename = "max-listing-entries")]
    pub max_listing_entries: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            run_timeout_secs: 300,
            pacing_ms: 1000,
            follow_detail_pages: true,
            follow_profile_pages: true,
            max_listing_entries: 20,
        }
    }
}
