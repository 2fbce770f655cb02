//! Browser rendering strategy
//!
//! A render spawns one headless browser process, asks it to dump the DOM
//! after scripts have run, and waits for it to exit. The process is the
//! session: it lives only inside [`Renderer::render`] and is killed if the
//! render future is dropped (timeout or run cancellation).

use crate::config::{RenderConfig, UserAgentConfig};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};

/// Browser binaries probed on `PATH` when none is configured
const BROWSER_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
];

/// Failure of a single render
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// No browser could be started at all
    #[error("no rendering engine available: {0}")]
    Unavailable(String),

    #[error("rendering engine crashed: {0}")]
    Crashed(String),

    #[error("rendering timed out after {0:?}")]
    Timeout(Duration),
}

impl RenderError {
    /// Returns true if another attempt may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Crashed(_) | Self::Timeout(_))
    }
}

/// Produces the post-script DOM of a page
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str) -> Result<String, RenderError>;
}

/// Renders pages with a headless Chrome or Chromium process
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    binary: Option<PathBuf>,
    user_agent: String,
    page_timeout: Duration,
    settle: Duration,
}

impl ChromeRenderer {
    pub fn from_config(render: &RenderConfig, user_agent: &UserAgentConfig) -> Self {
        let binary = render.browser_path.clone().or_else(locate_browser);

        match &binary {
            Some(path) => tracing::info!("Rendering with browser at {}", path.display()),
            None => tracing::warn!("No browser found on PATH; rendered fetches will fail"),
        }

        Self {
            binary,
            user_agent: user_agent.value.clone(),
            page_timeout: Duration::from_secs(render.page_timeout_secs),
            settle: Duration::from_millis(render.settle_ms),
        }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> Result<String, RenderError> {
        let binary = self
            .binary
            .as_deref()
            .ok_or_else(|| RenderError::Unavailable("no browser binary configured or found".into()))?;

        let session = RenderSession::launch(binary, url, &self.user_agent, self.settle)?;
        session.dump_dom(self.page_timeout).await
    }
}

/// One browser process, owned for the duration of a single render
struct RenderSession {
    child: Child,
}

impl RenderSession {
    fn launch(
        binary: &Path,
        url: &str,
        user_agent: &str,
        settle: Duration,
    ) -> Result<Self, RenderError> {
        let child = Command::new(binary)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--window-size=1920,1080",
            ])
            .arg(format!("--user-agent={}", user_agent))
            .arg(format!("--virtual-time-budget={}", settle.as_millis()))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    RenderError::Unavailable(format!("{}: {}", binary.display(), e))
                }
                _ => RenderError::Crashed(format!("failed to start browser: {}", e)),
            })?;

        tracing::debug!("Started render session for {}", url);
        Ok(Self { child })
    }

    async fn dump_dom(self, limit: Duration) -> Result<String, RenderError> {
        let output = tokio::time::timeout(limit, self.child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(limit))?
            .map_err(|e| RenderError::Crashed(e.to_string()))?;

        if !output.status.success() {
            return Err(RenderError::Crashed(format!(
                "browser exited with {}",
                output.status
            )));
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        if dom.trim().is_empty() {
            return Err(RenderError::Crashed("browser produced an empty DOM".into()));
        }

        Ok(dom)
    }
}

fn locate_browser() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| {
        BROWSER_CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}
