//! Batch orchestration
//!
//! The coordinator runs one pipeline per descriptor:
//! - Resolve the descriptor into fetch targets
//! - Fetch each target, carrying a per-pipeline rendering hint and pacer
//! - Extract records, enrich listing cards from their detail pages
//! - Follow organizer profiles for a missing social link
//! - Apply the descriptor's keyword filter
//!
//! Pipelines run concurrently up to `max-concurrency`, results are collected
//! positionally, and cross-entry deduplication happens once every pipeline
//! has finished or hit the run deadline.

use crate::config::{validate, Config};
use crate::crawler::fetcher::Fetcher;
use crate::crawler::pacer::Pacer;
use crate::event::{BatchEntry, BatchRun, EntryError, EventRecord, Origin, PageShape, SourceDescriptor};
use crate::extract::{extract, extract_profile_social, filter_by_keywords, Extraction};
use crate::source::{FetchTarget, SourceResolver};
use crate::ScrapeError;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Runs batches of source descriptors
pub struct Coordinator {
    config: Arc<Config>,
    resolver: SourceResolver,
    fetcher: Fetcher,
}

/// State owned by a single descriptor pipeline
struct Pipeline {
    pacer: Pacer,

    /// Set once a fetch in this pipeline signalled client-side rendering
    render_hint: bool,

    /// Social link found per organizer profile URL, including misses
    profiles: HashMap<String, Option<String>>,
}

impl Pipeline {
    fn new(config: &Config) -> Self {
        Self {
            pacer: Pacer::new(Duration::from_millis(config.batch.pacing_ms)),
            render_hint: false,
            profiles: HashMap::new(),
        }
    }
}

impl Coordinator {
    /// Creates a new coordinator
    ///
    /// This is the only place a run can fail as a whole: an invalid
    /// configuration is rejected here, before any descriptor is touched.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run batches
    /// * `Err(ScrapeError)` - Invalid configuration or HTTP client setup failure
    pub fn new(config: Config) -> Result<Self, ScrapeError> {
        validate(&config)?;
        let fetcher = Fetcher::from_config(&config)?;
        Self::with_fetcher(config, fetcher)
    }

    /// Creates a coordinator around an existing fetcher
    pub fn with_fetcher(config: Config, fetcher: Fetcher) -> Result<Self, ScrapeError> {
        validate(&config)?;
        let resolver = SourceResolver::from_config(&config.source)?;

        Ok(Self {
            config: Arc::new(config),
            resolver,
            fetcher,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs every descriptor under the configured run deadline
    ///
    /// Always returns one entry per descriptor, in input order.
    pub async fn run(&self, descriptors: Vec<SourceDescriptor>) -> BatchRun {
        let limit = Duration::from_secs(self.config.batch.run_timeout_secs);
        self.run_with_timeout(descriptors, limit).await
    }

    /// Runs a single descriptor as a one-element batch
    pub async fn run_one(&self, descriptor: SourceDescriptor) -> BatchEntry {
        let mut run = self.run(vec![descriptor.clone()]).await;
        run.entries
            .pop()
            .unwrap_or_else(|| BatchEntry::succeeded(descriptor, Vec::new(), 0))
    }

    /// Runs every descriptor under a shared deadline
    ///
    /// Pipelines still running at the deadline are dropped, which abandons
    /// their in-flight fetches; their entries carry a timeout error while
    /// entries that completed in time stand.
    pub async fn run_with_timeout(
        &self,
        descriptors: Vec<SourceDescriptor>,
        limit: Duration,
    ) -> BatchRun {
        let started = Instant::now();
        let deadline = started + limit;
        let total = descriptors.len();

        tracing::info!(
            "Starting batch of {} descriptor(s) with concurrency {}",
            total,
            self.config.batch.max_concurrency
        );

        let entries: Vec<BatchEntry> = stream::iter(descriptors)
            .map(|descriptor| async move {
                match tokio::time::timeout_at(deadline, self.run_descriptor(&descriptor)).await {
                    Ok(entry) => entry,
                    Err(_) => {
                        let err = ScrapeError::Timeout {
                            elapsed_ms: started.elapsed().as_millis() as u64,
                        };
                        tracing::warn!("{} abandoned: {}", descriptor, err);
                        BatchEntry::failed(descriptor, &err)
                    }
                }
            })
            .buffered(self.config.batch.max_concurrency.max(1))
            .collect()
            .await;

        let mut run = BatchRun::new(entries);
        let removed = run.dedup();

        tracing::info!(
            "Batch finished in {:?}: {} record(s), {} duplicate(s) removed, {} of {} entr{} failed",
            started.elapsed(),
            run.total_records(),
            removed,
            run.failed_count(),
            total,
            if total == 1 { "y" } else { "ies" }
        );

        run
    }

    async fn run_descriptor(&self, descriptor: &SourceDescriptor) -> BatchEntry {
        tracing::info!("Processing {}", descriptor);

        let targets = match self.resolver.resolve(descriptor) {
            Ok(targets) => targets,
            Err(e) => {
                let err = ScrapeError::from(e);
                tracing::warn!("Could not resolve {}: {}", descriptor, err);
                return BatchEntry::failed(descriptor.clone(), &err);
            }
        };

        let origin = descriptor.origin();
        let mut pipeline = Pipeline::new(&self.config);
        let mut records = Vec::new();
        let mut skipped = 0;
        let mut failures = 0;
        let mut first_error: Option<ScrapeError> = None;

        for target in &targets {
            match self.process_target(&mut pipeline, target, origin).await {
                Ok(extraction) => {
                    records.extend(extraction.records);
                    skipped += extraction.skipped;
                }
                Err(err) => {
                    tracing::warn!("{} failed for {}: {}", descriptor, target.url, err);
                    failures += 1;
                    first_error.get_or_insert(err);
                }
            }
        }

        if let Some(err) = first_error.as_ref().filter(|_| failures == targets.len()) {
            return BatchEntry::failed(descriptor.clone(), err);
        }

        let records = filter_by_keywords(records, descriptor.keywords());
        tracing::info!("{} produced {} record(s)", descriptor, records.len());

        BatchEntry {
            descriptor: descriptor.clone(),
            records,
            error: first_error.as_ref().map(EntryError::from),
            skipped,
        }
    }

    async fn process_target(
        &self,
        pipeline: &mut Pipeline,
        target: &FetchTarget,
        origin: Origin,
    ) -> Result<Extraction, ScrapeError> {
        let (page_url, content) = self.fetch_page(pipeline, &target.url).await?;
        let mut extraction = extract(&content, &page_url, target.shape, origin);

        match target.shape {
            PageShape::Single if extraction.records.is_empty() => {
                return Err(ScrapeError::Extraction {
                    url: page_url.to_string(),
                    message: "no event fields could be extracted".to_string(),
                });
            }
            PageShape::Single => {
                for record in extraction.records.iter_mut() {
                    self.enrich_from_profile(pipeline, record).await;
                }
            }
            PageShape::Listing if self.config.batch.follow_detail_pages => {
                self.enrich_from_detail_pages(pipeline, &mut extraction.records, origin)
                    .await;
            }
            _ => {}
        }

        Ok(extraction)
    }

    /// Replaces listing cards with their detail-page record, falling back to
    /// card fields where the detail page has none
    async fn enrich_from_detail_pages(
        &self,
        pipeline: &mut Pipeline,
        records: &mut [EventRecord],
        origin: Origin,
    ) {
        let limit = self.config.batch.max_listing_entries;

        for record in records.iter_mut().take(limit) {
            let detail_url = match Url::parse(&record.source_url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!("Skipping detail page {}: {}", record.source_url, e);
                    continue;
                }
            };

            match self.fetch_page(pipeline, &detail_url).await {
                Ok((page_url, content)) => {
                    let detail = extract(&content, &page_url, PageShape::Single, origin);
                    if let Some(mut detailed) = detail.records.into_iter().next() {
                        detailed.source_url = record.source_url.clone();
                        detailed.fill_missing_from(record);
                        *record = detailed;
                        self.enrich_from_profile(pipeline, record).await;
                    }
                }
                Err(e) => tracing::warn!(
                    "Detail page {} failed, keeping listing card: {}",
                    record.source_url,
                    e
                ),
            }
        }
    }

    /// Fills a missing social link from the organizer's profile page
    ///
    /// Each profile is fetched at most once per pipeline; a failed fetch
    /// leaves the record as it was.
    async fn enrich_from_profile(&self, pipeline: &mut Pipeline, record: &mut EventRecord) {
        if !self.config.batch.follow_profile_pages || record.organizer_social_url.is_some() {
            return;
        }
        let Some(profile) = record.organizer_profile_url.clone() else {
            return;
        };

        if let Some(cached) = pipeline.profiles.get(&profile) {
            record.organizer_social_url.clone_from(cached);
            return;
        }

        let social = match Url::parse(&profile) {
            Ok(profile_url) => match self.fetch_page(pipeline, &profile_url).await {
                Ok((page_url, content)) => extract_profile_social(&content, &page_url),
                Err(e) => {
                    tracing::warn!("Organizer profile {} failed: {}", profile, e);
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Skipping organizer profile {}: {}", profile, e);
                None
            }
        };

        if let Some(link) = &social {
            tracing::debug!("Found social link {} on {}", link, profile);
        }
        pipeline.profiles.insert(profile, social.clone());
        record.organizer_social_url = social;
    }

    /// Paced fetch that updates the pipeline's rendering hint
    async fn fetch_page(
        &self,
        pipeline: &mut Pipeline,
        url: &Url,
    ) -> Result<(Url, String), ScrapeError> {
        pipeline.pacer.wait().await;

        let result = self.fetcher.fetch(url.as_str(), pipeline.render_hint).await;
        tracing::debug!(
            "Fetched {} via {:?} in {} attempt(s)",
            url,
            result.strategy_used,
            result.attempt_count
        );

        if result.render_signalled && self.fetcher.can_render() && !pipeline.render_hint {
            tracing::debug!("Rendering will be preferred for the rest of this pipeline");
            pipeline.render_hint = true;
        }

        let page_url = Url::parse(&result.final_url).unwrap_or_else(|_| url.clone());
        let content = result.into_content()?;

        if page_url != *url {
            tracing::debug!("{} redirected to {}", url, page_url);
        }
        Ok((page_url, content))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("resolver", &self.resolver)
            .field("default_strategy", &self.config.fetcher.default_strategy)
            .field("can_render", &self.fetcher.can_render())
            .finish()
    }
}

/// Convenience wrapper: builds a coordinator and runs one batch
pub async fn run_batch(
    config: Config,
    descriptors: Vec<SourceDescriptor>,
) -> Result<BatchRun, ScrapeError> {
    let coordinator = Coordinator::new(config)?;
    Ok(coordinator.run(descriptors).await)
}
