use crate::config::types::{
    BatchConfig, CityEntry, Config, FetcherConfig, RenderConfig, SourceConfig, UserAgentConfig,
};
use crate::crawler::FetchStrategy;
use crate::ConfigError;
use url::Url;

const MAX_CONCURRENCY: usize = 32;
const MAX_RETRIES: u32 = 5;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher, &config.render)?;
    validate_render_config(&config.render)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_source_config(&config.source)?;
    validate_batch_config(&config.batch)?;
    Ok(())
}

/// Returns true if `slug` is a non-empty path segment of ASCII letters,
/// digits, hyphens and underscores
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 128
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn validate_fetcher_config(
    config: &FetcherConfig,
    render: &RenderConfig,
) -> Result<(), ConfigError> {
    if config.max_retries > MAX_RETRIES {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= {}, got {}",
            MAX_RETRIES, config.max_retries
        )));
    }

    if config.request_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.default_strategy == FetchStrategy::Render && !render.enabled {
        return Err(ConfigError::Validation(
            "default-strategy = \"render\" requires [render] enabled = true".to_string(),
        ));
    }

    Ok(())
}

fn validate_render_config(config: &RenderConfig) -> Result<(), ConfigError> {
    if config.max_sessions < 1 {
        return Err(ConfigError::Validation(format!(
            "max-sessions must be >= 1, got {}",
            config.max_sessions
        )));
    }

    if config.page_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "page-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if !config.explore_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "explore-path must start with '/', got '{}'",
            config.explore_path
        )));
    }

    for entry in &config.cities {
        validate_city_entry(entry)?;
    }

    Ok(())
}

fn validate_city_entry(entry: &CityEntry) -> Result<(), ConfigError> {
    if entry.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "city name cannot be empty".to_string(),
        ));
    }

    if !is_valid_slug(&entry.slug) {
        return Err(ConfigError::Validation(format!(
            "city '{}' has invalid slug '{}'",
            entry.name, entry.slug
        )));
    }

    Ok(())
}

fn validate_batch_config(config: &BatchConfig) -> Result<(), ConfigError> {
    if config.max_concurrency < 1 || config.max_concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrency
        )));
    }

    if config.run_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "run-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}
