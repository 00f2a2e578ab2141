//! Static page resolver: one GET, then scan the markup for a media tag.
//!
//! Works for pages that ship the `<video>` element or an `og:video` meta tag
//! in the initial HTML. Script-rendered pages need the browser resolver.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use super::{check_media_url, PageResolver, ResolveError};
use crate::http::{self, HttpOptions};

/// Tag patterns tried in order; capture group 1 is the media URL.
fn media_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r#"(?is)<(?:video|source)\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#,
            concat!(
                r#"(?is)<meta\b[^>]*?\bproperty\s*=\s*["']og:video(?::secure_url|:url)?["']"#,
                r#"[^>]*?\bcontent\s*=\s*["']([^"']+)["']"#,
            ),
            concat!(
                r#"(?is)<meta\b[^>]*?\bcontent\s*=\s*["']([^"']+)["']"#,
                r#"[^>]*?\bproperty\s*=\s*["']og:video(?::secure_url|:url)?["']"#,
            ),
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static media pattern"))
        .collect()
    })
}

/// First media URL candidate in `html`, if any.
pub(crate) fn find_media_src(html: &str) -> Option<&str> {
    media_patterns()
        .iter()
        .find_map(|re| re.captures(html).and_then(|c| c.get(1)))
        .map(|m| m.as_str())
}

#[derive(Debug, Clone)]
pub struct HtmlPageResolver {
    http: HttpOptions,
}

impl HtmlPageResolver {
    /// `timeout` bounds the whole page fetch.
    pub fn new(timeout: Duration, connect_timeout: Duration, user_agent: Option<String>) -> Self {
        Self {
            http: HttpOptions {
                connect_timeout: connect_timeout.min(timeout),
                timeout,
                user_agent,
            },
        }
    }
}

impl PageResolver for HtmlPageResolver {
    fn resolve(&self, source_url: &str) -> Result<String, ResolveError> {
        let response = http::get(source_url, &self.http)?;
        if !response.is_success() {
            return Err(ResolveError::Http(response.status));
        }
        let page = response.text();
        let base = response.effective_url.as_deref().unwrap_or(source_url);
        match find_media_src(&page) {
            Some(src) => check_media_url(src, base),
            None => Err(ResolveError::NotFound),
        }
    }
}
