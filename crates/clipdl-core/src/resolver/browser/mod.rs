//! Browser-backed resolver on the Chrome DevTools Protocol.
//!
//! Each resolution leases its own browser from the pool, opens a fresh page,
//! loads the clip page and polls the `<video>` element until it reports a
//! source or the timeout expires. The browser is either launched locally
//! (headless Chrome/Chromium) or reached through a DevTools websocket URL.

mod pool;

pub use pool::{SessionLease, SessionPool};

use chromiumoxide::error::CdpError;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig as CdpBrowserConfig, Page};
use futures::StreamExt;
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::{check_media_url, PageResolver, ResolveError};

/// The video element's source, or an empty string while there is none.
const MEDIA_SRC_SCRIPT: &str = "(() => { const v = document.querySelector('video'); \
    if (!v) { return ''; } \
    return v.currentSrc || v.src || v.getAttribute('src') || ''; })()";

impl From<CdpError> for ResolveError {
    fn from(err: CdpError) -> Self {
        match err {
            CdpError::Timeout => ResolveError::Timeout,
            other => ResolveError::Protocol(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    /// DevTools websocket of an already running browser. `None` launches one.
    pub connect_url: Option<String>,
    /// Chrome/Chromium binary; auto-detected when unset.
    pub chrome_path: Option<PathBuf>,
    pub browser_args: Vec<String>,
    /// Upper bound for page load and for waiting on the video element.
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub launch_timeout: Duration,
    /// Browsers kept open between resolutions; usually the worker count.
    pub max_idle_browsers: usize,
    pub user_agent: Option<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            connect_url: None,
            chrome_path: None,
            browser_args: default_browser_args(),
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            launch_timeout: Duration::from_secs(20),
            max_idle_browsers: 5,
            user_agent: None,
        }
    }
}

pub fn default_browser_args() -> Vec<String> {
    ["--no-sandbox", "--disable-dev-shm-usage", "--disable-gpu"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// One browser process (or connection) plus the task pumping its CDP events.
pub struct BrowserSession {
    browser: Browser,
    events: JoinHandle<()>,
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.events.abort();
    }
}

pub struct BrowserResolver {
    pool: SessionPool<BrowserSession>,
    settings: BrowserSettings,
}

impl BrowserResolver {
    pub fn new(settings: BrowserSettings) -> Self {
        Self {
            pool: SessionPool::new(settings.max_idle_browsers),
            settings,
        }
    }

    pub fn pool(&self) -> &SessionPool<BrowserSession> {
        &self.pool
    }

    /// Async form of [`PageResolver::resolve`].
    pub async fn resolve_async(&self, source_url: &str) -> Result<String, ResolveError> {
        let session = match self.pool.take_idle() {
            Some(session) => {
                tracing::debug!("reusing idle browser");
                session
            }
            None => self.start_session().await?,
        };
        let mut lease = self.pool.lease(session);

        let result = self.wait_for_media(&lease.browser, source_url).await;
        if matches!(
            result,
            Err(ResolveError::Transport(_)) | Err(ResolveError::Protocol(_))
        ) {
            lease.mark_broken();
        }
        result
    }

    async fn start_session(&self) -> Result<BrowserSession, ResolveError> {
        let (browser, mut handler) = match &self.settings.connect_url {
            Some(url) => {
                let config = HandlerConfig {
                    request_timeout: self.settings.timeout,
                    ..Default::default()
                };
                Browser::connect_with_config(url, config).await.map_err(|e| {
                    ResolveError::Transport(format!("failed to connect to browser at {url}: {e}"))
                })?
            }
            None => Browser::launch(self.launch_config()?)
                .await
                .map_err(|e| ResolveError::Transport(format!("browser launch failed: {e}")))?,
        };

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                tracing::trace!(?event, "browser event");
            }
        });
        tracing::debug!("browser session started");
        Ok(BrowserSession { browser, events })
    }

    fn launch_config(&self) -> Result<CdpBrowserConfig, ResolveError> {
        let mut builder = CdpBrowserConfig::builder()
            .request_timeout(self.settings.timeout)
            .launch_timeout(self.settings.launch_timeout);
        if let Some(path) = &self.settings.chrome_path {
            builder = builder.chrome_executable(path);
        }
        if let Some(ua) = &self.settings.user_agent {
            builder = builder.arg(format!("--user-agent={ua}"));
        }
        for arg in &self.settings.browser_args {
            builder = builder.arg(arg);
        }
        builder
            .build()
            .map_err(|e| ResolveError::Transport(format!("browser launch failed: {e}")))
    }

    async fn wait_for_media(
        &self,
        browser: &Browser,
        source_url: &str,
    ) -> Result<String, ResolveError> {
        let page = browser.new_page("about:blank").await?;
        let result = self.poll_page(&page, source_url).await;
        if let Err(e) = page.close().await {
            tracing::debug!(error = %e, "failed to close page");
        }
        result
    }

    async fn poll_page(&self, page: &Page, source_url: &str) -> Result<String, ResolveError> {
        let deadline = Instant::now() + self.settings.timeout;
        match tokio::time::timeout(self.settings.timeout, page.goto(source_url)).await {
            Ok(loaded) => {
                loaded?;
            }
            Err(_) => return Err(ResolveError::Timeout),
        }

        let mut last_unusable: Option<String> = None;
        loop {
            let src: String = page
                .evaluate(MEDIA_SRC_SCRIPT)
                .await?
                .into_value()
                .map_err(|e| ResolveError::Protocol(e.to_string()))?;
            if !src.trim().is_empty() {
                match check_media_url(&src, source_url) {
                    Ok(url) => return Ok(url),
                    // A blob: source can be swapped for a real one while the player boots.
                    Err(ResolveError::InvalidMediaUrl(u)) => last_unusable = Some(u),
                    Err(e) => return Err(e),
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(match last_unusable {
                    Some(u) => ResolveError::InvalidMediaUrl(u),
                    None => ResolveError::Timeout,
                });
            }
            tokio::time::sleep(self.settings.poll_interval.min(deadline - now)).await;
        }
    }
}

/// Blocks the calling thread on the runtime it belongs to. Call from a
/// `spawn_blocking` worker, never from inside an async task.
impl PageResolver for BrowserResolver {
    fn resolve(&self, source_url: &str) -> Result<String, ResolveError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            ResolveError::Transport(format!("browser resolver needs a tokio runtime: {e}"))
        })?;
        handle.block_on(self.resolve_async(source_url))
    }
}
