//! The unit of work: one clip to resolve and download.

use thiserror::Error;
use url::Url;

/// Host that serves bare `/<slug>` clip pages.
const CLIPS_HOST: &str = "clips.twitch.tv";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("source URL is empty")]
    EmptyUrl,

    #[error("invalid source URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// One clip-download job. Immutable once built; the `with_*` builders consume
/// the value and are meant for construction only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    name: Option<String>,
    source_url: String,
    order: Option<u32>,
    player: Option<String>,
}

impl Job {
    /// Creates a job for a clip page URL. The URL must be absolute http(s)
    /// and look like a clip page (`/<channel>/clip/<slug>` or
    /// `clips.twitch.tv/<slug>`).
    pub fn new(source_url: impl Into<String>) -> Result<Self, JobError> {
        let source_url = source_url.into().trim().to_string();
        validate_clip_url(&source_url)?;
        Ok(Self {
            name: None,
            source_url,
            order: None,
            player: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into()).filter(|n: &String| !n.trim().is_empty());
        self
    }

    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }

    pub fn with_player(mut self, player: impl Into<String>) -> Self {
        self.player = Some(player.into()).filter(|p: &String| !p.trim().is_empty());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn order(&self) -> Option<u32> {
        self.order
    }

    pub fn player(&self) -> Option<&str> {
        self.player.as_deref()
    }

    /// Human-readable identifier for logs and summaries.
    pub fn label(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match (self.order, self.player.as_deref()) {
            (Some(order), Some(player)) => format!("{}@{}", order, player),
            (Some(order), None) => format!("#{}", order),
            _ => self.source_url.clone(),
        }
    }
}

/// Last path segment of a clip URL (the clip slug), if any.
pub fn clip_slug(source_url: &str) -> Option<String> {
    let url = Url::parse(source_url).ok()?;
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(String::from)
}

fn validate_clip_url(source_url: &str) -> Result<(), JobError> {
    if source_url.is_empty() {
        return Err(JobError::EmptyUrl);
    }
    let invalid = |reason: &str| JobError::InvalidUrl {
        url: source_url.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(source_url).map_err(|e| invalid(&e.to_string()))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("scheme must be http or https"));
    }
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let is_clip_page = match segments.as_slice() {
        [_channel, "clip", _slug] => true,
        [_slug] => url.host_str() == Some(CLIPS_HOST),
        _ => false,
    };
    if !is_clip_page {
        return Err(invalid("not a clip page URL"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_channel_clip_urls() {
        let job = Job::new("https://www.twitch.tv/somechannel/clip/FunnySlug-abc123").unwrap();
        assert_eq!(job.source_url(), "https://www.twitch.tv/somechannel/clip/FunnySlug-abc123");
        assert!(job.name().is_none());
        assert!(job.order().is_none());
    }

    #[test]
    fn accepts_query_and_clips_host() {
        assert!(Job::new("https://twitch.tv/x/clip/AAA?filter=clips").is_ok());
        assert!(Job::new("https://clips.twitch.tv/SomeSlug").is_ok());
        assert!(Job::new("http://127.0.0.1:8080/chan/clip/abc").is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        assert_eq!(Job::new("   ").unwrap_err(), JobError::EmptyUrl);
        assert!(matches!(Job::new("not a url"), Err(JobError::InvalidUrl { .. })));
        assert!(matches!(
            Job::new("ftp://twitch.tv/x/clip/AAA"),
            Err(JobError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Job::new("https://twitch.tv/x/videos/123"),
            Err(JobError::InvalidUrl { .. })
        ));
        assert!(matches!(
            Job::new("https://example.com/SomeSlug"),
            Err(JobError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn labels() {
        let base = Job::new("https://twitch.tv/x/clip/AAA").unwrap();
        assert_eq!(base.label(), "https://twitch.tv/x/clip/AAA");
        assert_eq!(base.clone().with_order(3).label(), "#3");
        assert_eq!(base.clone().with_order(5).with_player("Bob").label(), "5@Bob");
        assert_eq!(base.clone().with_name("1. Great").with_order(5).label(), "1. Great");
    }

    #[test]
    fn blank_name_and_player_are_dropped() {
        let job = Job::new("https://twitch.tv/x/clip/AAA")
            .unwrap()
            .with_name("  ")
            .with_player("");
        assert!(job.name().is_none());
        assert!(job.player().is_none());
    }

    #[test]
    fn slug_of_clip_url() {
        assert_eq!(clip_slug("https://twitch.tv/x/clip/AAA?x=1").as_deref(), Some("AAA"));
        assert_eq!(clip_slug("https://clips.twitch.tv/Slug/").as_deref(), Some("Slug"));
    }
}
