//! Page fetcher
//!
//! This module retrieves raw page content using one of two strategies:
//! - A plain HTTP GET through a shared `reqwest` client
//! - A headless browser render through a [`Renderer`]
//!
//! Each call to [`Fetcher::fetch`] walks a small state machine:
//! `Start -> HttpAttempted -> (RenderAttempted | Done)`, or straight to
//! `RenderAttempted` when rendering is preferred. There is no path back to
//! `HttpAttempted`, so a thin rendered page is never re-fetched over HTTP.

use crate::config::{Config, FetcherConfig, UserAgentConfig};
use crate::crawler::render::{ChromeRenderer, Renderer};
use crate::FetchError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// Elements whose text never reaches the reader
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "noscript", "template"];

/// How a page was retrieved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    #[default]
    Http,
    Render,
}

/// Outcome of one fetch, owned by the pipeline that requested it
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// URL as requested
    pub url: String,

    /// URL the content was served from, after redirects
    pub final_url: String,

    pub raw_content: Option<String>,

    /// Strategy that produced the outcome
    pub strategy_used: FetchStrategy,

    /// Attempts across both strategies, retries included
    pub attempt_count: u32,

    /// The HTTP response looked like a client-side-only shell
    pub render_signalled: bool,

    pub error: Option<FetchError>,
}

impl FetchResult {
    pub fn ok(&self) -> bool {
        self.error.is_none() && self.raw_content.is_some()
    }

    /// Returns the content, or the error that prevented fetching it
    pub fn into_content(self) -> Result<String, FetchError> {
        match (self.raw_content, self.error) {
            (_, Some(err)) => Err(err),
            (Some(content), None) => Ok(content),
            (None, None) => Err(FetchError::Terminal {
                url: self.url,
                status: None,
                message: "no content".to_string(),
            }),
        }
    }
}

/// Content plus where it came from
#[derive(Debug)]
struct Page {
    final_url: String,
    body: String,
}

enum FetchState {
    Start,
    HttpAttempted(Result<Page, FetchError>),
    RenderAttempted(Result<Page, FetchError>),
    Done(Result<Page, FetchError>),
}

/// Builds the shared HTTP client
///
/// # Arguments
///
/// * `fetcher` - Timeouts
/// * `user_agent` - Identification headers sent with every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    fetcher: &FetcherConfig,
    user_agent: &UserAgentConfig,
) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    if let Ok(value) = HeaderValue::from_str(&user_agent.accept_language) {
        headers.insert(ACCEPT_LANGUAGE, value);
    }

    Client::builder()
        .user_agent(user_agent.value.clone())
        .default_headers(headers)
        .timeout(Duration::from_secs(fetcher.request_timeout_secs))
        .connect_timeout(Duration::from_secs(fetcher.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrieves pages over HTTP, falling back to a browser render once
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    renderer: Option<Arc<dyn Renderer>>,
    render_slots: Arc<Semaphore>,
    default_strategy: FetchStrategy,
    max_retries: u32,
    backoff: Duration,
    min_body_bytes: usize,
    min_text_chars: usize,
}

impl Fetcher {
    /// Creates a fetcher from configuration
    ///
    /// With `[render] enabled = false` the fetcher has no rendering strategy.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.fetcher, &config.user_agent)?;

        let renderer: Option<Arc<dyn Renderer>> = if config.render.enabled {
            Some(Arc::new(ChromeRenderer::from_config(
                &config.render,
                &config.user_agent,
            )))
        } else {
            None
        };

        Ok(Self {
            client,
            renderer,
            render_slots: Arc::new(Semaphore::new(config.render.max_sessions.max(1))),
            default_strategy: config.fetcher.default_strategy,
            max_retries: config.fetcher.max_retries,
            backoff: Duration::from_millis(config.fetcher.retry_backoff_ms),
            min_body_bytes: config.fetcher.min_body_bytes,
            min_text_chars: config.fetcher.min_text_chars,
        })
    }

    /// Replaces the rendering strategy
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Removes the rendering strategy
    pub fn without_renderer(mut self) -> Self {
        self.renderer = None;
        self
    }

    pub fn can_render(&self) -> bool {
        self.renderer.is_some()
    }

    /// Fetches a page, choosing and falling back between strategies
    ///
    /// Never fails outright: every failure is reported in the returned
    /// [`FetchResult`] with `ok() == false`.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute page URL
    /// * `prefer_rendering` - Skip the HTTP strategy when a renderer exists
    pub async fn fetch(&self, url: &str, prefer_rendering: bool) -> FetchResult {
        let wants_render = prefer_rendering || self.default_strategy == FetchStrategy::Render;

        let mut attempts = 0;
        let mut strategy_used = FetchStrategy::Http;
        let mut render_signalled = false;
        let mut state = FetchState::Start;

        let outcome = loop {
            state = match state {
                FetchState::Start => match &self.renderer {
                    Some(renderer) if wants_render => {
                        strategy_used = FetchStrategy::Render;
                        FetchState::RenderAttempted(
                            self.render_with_retries(renderer.as_ref(), url, &mut attempts)
                                .await,
                        )
                    }
                    _ => FetchState::HttpAttempted(
                        self.with_retries(FetchStrategy::Http, url, &mut attempts, move || {
                            self.http_once(url)
                        })
                        .await,
                    ),
                },

                FetchState::HttpAttempted(Ok(page)) if self.needs_rendering(&page.body) => {
                    render_signalled = true;
                    match &self.renderer {
                        Some(renderer) => {
                            tracing::info!("{} looks client-rendered, retrying with browser", url);
                            strategy_used = FetchStrategy::Render;
                            FetchState::RenderAttempted(
                                self.render_with_retries(renderer.as_ref(), url, &mut attempts)
                                    .await,
                            )
                        }
                        None => {
                            tracing::warn!(
                                "{} looks client-rendered but rendering is disabled; using HTTP content",
                                url
                            );
                            FetchState::Done(Ok(page))
                        }
                    }
                }

                FetchState::HttpAttempted(result) | FetchState::RenderAttempted(result) => {
                    FetchState::Done(result)
                }

                FetchState::Done(result) => break result,
            };
        };

        let (final_url, raw_content, error) = match outcome {
            Ok(page) => (page.final_url, Some(page.body), None),
            Err(err) => {
                tracing::warn!("Fetch of {} failed after {} attempt(s): {}", url, attempts, err);
                (url.to_string(), None, Some(err))
            }
        };

        FetchResult {
            url: url.to_string(),
            final_url,
            raw_content,
            strategy_used,
            attempt_count: attempts,
            render_signalled,
            error,
        }
    }

    /// Runs `op` until it succeeds, fails terminally, or retries run out
    async fn with_retries<F, Fut>(
        &self,
        strategy: FetchStrategy,
        url: &str,
        attempts: &mut u32,
        mut op: F,
    ) -> Result<Page, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Page, FetchError>>,
    {
        let mut retries = 0;
        loop {
            *attempts += 1;
            match op().await {
                Err(err) if err.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    tracing::debug!(
                        "{:?} attempt {} for {} failed: {}; retrying in {:?}",
                        strategy,
                        retries,
                        url,
                        err,
                        self.backoff
                    );
                    tokio::time::sleep(self.backoff).await;
                }
                result => return result,
            }
        }
    }

    async fn render_with_retries(
        &self,
        renderer: &dyn Renderer,
        url: &str,
        attempts: &mut u32,
    ) -> Result<Page, FetchError> {
        self.with_retries(FetchStrategy::Render, url, attempts, move || {
            self.render_once(renderer, url)
        })
        .await
        .map_err(|err| match err {
            FetchError::Transient { url, message } => FetchError::RenderingUnavailable {
                url,
                reason: message,
            },
            other => other,
        })
    }

    async fn http_once(&self, url: &str) -> Result<Page, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::Terminal {
            url: url.to_string(),
            status: None,
            message: format!("malformed URL: {}", e),
        })?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(url, status));
        }

        let final_url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        Ok(Page { final_url, body })
    }

    /// One browser session: acquired, used, and released within this call
    async fn render_once(&self, renderer: &dyn Renderer, url: &str) -> Result<Page, FetchError> {
        let _permit = self
            .render_slots
            .acquire()
            .await
            .map_err(|e| FetchError::RenderingUnavailable {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        match renderer.render(url).await {
            Ok(body) => Ok(Page {
                final_url: url.to_string(),
                body,
            }),
            Err(err) if err.is_transient() => Err(FetchError::Transient {
                url: url.to_string(),
                message: err.to_string(),
            }),
            Err(err) => Err(FetchError::RenderingUnavailable {
                url: url.to_string(),
                reason: err.to_string(),
            }),
        }
    }

    /// Returns true if an HTTP body looks like a shell that needs scripts to fill it
    pub fn needs_rendering(&self, body: &str) -> bool {
        body.len() < self.min_body_bytes || visible_text_len(body) < self.min_text_chars
    }
}

/// Counts characters of text a reader would see
fn visible_text_len(body: &str) -> usize {
    let document = Html::parse_document(body);

    document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map_or(false, |el| HIDDEN_TAGS.contains(&el.name()))
            });
            (!hidden).then(|| text.trim().chars().count())
        })
        .sum()
}

/// Maps a non-success status to a fetch error
///
/// | Status | Outcome |
/// |--------|---------|
/// | 408, 429 | Transient |
/// | 5xx | Transient |
/// | other | Terminal |
fn classify_status(url: &str, status: StatusCode) -> FetchError {
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        FetchError::Transient {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        }
    } else {
        FetchError::Terminal {
            url: url.to_string(),
            status: Some(status.as_u16()),
            message: format!("HTTP {}", status),
        }
    }
}

fn classify_reqwest_error(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_timeout() || err.is_connect() || err.is_body() || err.is_request() {
        FetchError::Transient {
            url: url.to_string(),
            message: err.to_string(),
        }
    } else {
        FetchError::Terminal {
            url: url.to_string(),
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}
