//! Small blocking HTTP helpers on top of curl easy handles.
//!
//! Used by the HTML resolver for page fetches. Media downloads stream to disk
//! and live in `fetcher`. Everything here blocks the current thread; call from
//! `spawn_blocking` when used from async code.

use std::time::Duration;
use thiserror::Error;

/// Upper bound on buffered page bodies.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("{0}")]
    Curl(#[from] curl::Error),

    #[error("response body exceeds size limit")]
    TooLarge,
}

impl HttpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Curl(e) if e.is_operation_timedout())
    }
}

/// Per-request settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Whole-request timeout.
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }
}

/// Buffered response: status code, final URL after redirects, and body bytes.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u32,
    pub effective_url: Option<String>,
    pub body: Vec<u8>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Plain GET, following redirects.
pub fn get(url: &str, opts: &HttpOptions) -> Result<Response, HttpError> {
    let mut body: Vec<u8> = Vec::new();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.timeout(opts.timeout)?;
    if let Some(ua) = &opts.user_agent {
        easy.useragent(ua)?;
    }

    let mut too_large = false;
    {
        let mut transfer = easy.transfer();
        transfer.write_function(|data| {
            if body.len() + data.len() > MAX_BODY_BYTES {
                too_large = true;
                return Ok(0); // abort transfer
            }
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        let performed = transfer.perform();
        drop(transfer);
        if too_large {
            return Err(HttpError::TooLarge);
        }
        performed?;
    }

    let status = easy.response_code()?;
    let effective_url = easy.effective_url()?.map(String::from);
    Ok(Response {
        status,
        effective_url,
        body,
    })
}
