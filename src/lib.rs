//! Luma-Events: an event-listing extraction engine
//!
//! This crate fetches listing and event pages from lu.ma, turns their loosely
//! structured HTML into normalized event records, and aggregates the results of
//! several sources (explore feed, event slug, city listing, arbitrary URLs) into
//! one batch result with per-source error annotations.

pub mod config;
pub mod crawler;
pub mod event;
pub mod extract;
pub mod output;
pub mod source;

use event::ErrorKind;
use thiserror::Error;

/// Main error type for Luma-Events operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Extraction failed for {url}: {message}")]
    Extraction { url: String, message: String },

    #[error("Timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScrapeError {
    /// Classifies the error for per-entry reporting
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolve(ResolveError::InvalidDescriptor(_)) => ErrorKind::InvalidDescriptor,
            Self::Resolve(ResolveError::UnknownCity(_)) => ErrorKind::UnknownCity,
            Self::Fetch(e) => e.kind(),
            Self::Extraction { .. } => ErrorKind::ExtractionFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Config(_) | Self::Output(_) | Self::Reqwest(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while turning a source descriptor into fetch targets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Invalid source descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("Unknown city: {0}")]
    UnknownCity(String),
}

/// Errors produced by the fetcher, after retries are exhausted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network failure, timeout, 5xx or rate-limit status
    #[error("Transient fetch failure for {url}: {message}")]
    Transient { url: String, message: String },

    /// 4xx status or malformed URL; never retried
    #[error("Fetch failed for {url}: {message}")]
    Terminal {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// The rendering strategy could not run
    #[error("Rendering unavailable for {url}: {reason}")]
    RenderingUnavailable { url: String, reason: String },
}

impl FetchError {
    /// Returns true if the failure may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient { .. } => ErrorKind::TransientFetch,
            Self::Terminal { .. } => ErrorKind::TerminalFetch,
            Self::RenderingUnavailable { .. } => ErrorKind::RenderingUnavailable,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Transient { url, .. }
            | Self::Terminal { url, .. }
            | Self::RenderingUnavailable { url, .. } => url,
        }
    }
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Luma-Events operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, FetchStrategy, Fetcher};
pub use event::{BatchEntry, BatchRun, EventRecord, Origin, PageShape, SourceDescriptor};
pub use extract::extract;
pub use output::{serialize, stats, ExportFormat, StatsSummary};
pub use source::SourceResolver;
