//! Fetching and batch orchestration
//!
//! This module contains the runtime side of the engine:
//! - HTTP fetching with retry and render fallback
//! - Headless browser rendering behind the [`Renderer`] trait
//! - Per-pipeline request pacing
//! - Batch coordination across source descriptors

mod coordinator;
mod fetcher;
mod pacer;
mod render;

pub use coordinator::{run_batch, Coordinator};
pub use fetcher::{build_http_client, FetchResult, FetchStrategy, Fetcher};
pub use pacer::Pacer;
pub use render::{ChromeRenderer, RenderError, Renderer};

use crate::config::Config;
use crate::event::{BatchRun, SourceDescriptor};
use crate::ScrapeError;

/// Runs a complete batch
///
/// This is the main entry point for extraction. It will:
/// 1. Validate the configuration and build the HTTP client
/// 2. Resolve every descriptor into fetch targets
/// 3. Fetch and extract each target, paced per descriptor
/// 4. Deduplicate records across the whole run
///
/// # Arguments
///
/// * `config` - The engine configuration
/// * `descriptors` - Sources to process, in the order results should appear
///
/// # Returns
///
/// * `Ok(BatchRun)` - One entry per descriptor, failures annotated in place
/// * `Err(ScrapeError)` - The configuration was rejected
pub async fn scrape(
    config: Config,
    descriptors: Vec<SourceDescriptor>,
) -> Result<BatchRun, ScrapeError> {
    run_batch(config, descriptors).await
}
