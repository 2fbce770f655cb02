//! Configuration module for Luma-Events
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; an empty file yields [`Config::default`].
//!
//! # Example
//!
//! ```no_run
//! use luma_events::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("luma.toml")).unwrap();
//! println!("Batch concurrency: {}", config.batch.max_concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BatchConfig, CityEntry, Config, FetcherConfig, RenderConfig, SourceConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::{is_valid_slug, validate};
