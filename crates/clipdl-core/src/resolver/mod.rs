//! Page resolvers: turn a clip page URL into a direct media URL.
//!
//! The job runner only depends on [`PageResolver`]. Implementations must be
//! callable from many worker threads at once without sharing per-call state
//! (e.g. a browser session) between concurrent calls.

mod browser;
mod html;

pub use browser::{
    default_browser_args, BrowserResolver, BrowserSession, BrowserSettings, SessionLease,
    SessionPool,
};
pub use html::HtmlPageResolver;

use thiserror::Error;
use url::Url;

use crate::http::HttpError;

/// Why a page could not be resolved to a media URL.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("timed out waiting for media on page")]
    Timeout,

    #[error("no media element found on page")]
    NotFound,

    #[error("page returned HTTP {0}")]
    Http(u32),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("browser session error: {0}")]
    Protocol(String),

    #[error("unusable media URL: {0}")]
    InvalidMediaUrl(String),
}

impl From<HttpError> for ResolveError {
    fn from(err: HttpError) -> Self {
        if err.is_timeout() {
            ResolveError::Timeout
        } else {
            ResolveError::Transport(err.to_string())
        }
    }
}

/// Resolves a clip page URL to a downloadable media URL.
pub trait PageResolver: Send + Sync {
    fn resolve(&self, source_url: &str) -> Result<String, ResolveError>;
}

/// Normalizes a media candidate found on `page_url`: relative references are
/// joined against the page, and only absolute http(s) URLs are accepted.
pub(crate) fn check_media_url(candidate: &str, page_url: &str) -> Result<String, ResolveError> {
    let candidate = candidate.trim().replace("&amp;", "&");
    if candidate.is_empty() {
        return Err(ResolveError::NotFound);
    }
    if candidate.starts_with("blob:") || candidate.starts_with("data:") {
        return Err(ResolveError::InvalidMediaUrl(candidate));
    }
    let base = Url::parse(page_url).map_err(|e| ResolveError::InvalidMediaUrl(e.to_string()))?;
    let media = base
        .join(&candidate)
        .map_err(|e| ResolveError::InvalidMediaUrl(format!("{}: {}", candidate, e)))?;
    if media.scheme() != "http" && media.scheme() != "https" {
        return Err(ResolveError::InvalidMediaUrl(media.to_string()));
    }
    Ok(media.to_string())
}
