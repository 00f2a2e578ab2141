//! Job-list parsing from free-form text.
//!
//! Three layouts are accepted:
//! - bare clip URLs anywhere in the text, auto-numbered 1, 2, 3, ...
//! - `@player` lines, each followed by a URL line
//! - alternating `name` / `url` line pairs
//!
//! Entries that do not form a valid job are skipped with a warning.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::SetupError;
use crate::job::{clip_slug, Job};

fn clip_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"https?://(?:www\.)?twitch\.tv/\w+/clip/[\w-]+(?:\?\S*)?")
            .expect("static clip URL pattern")
    })
}

fn leading_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+\s*[.)]\s*").expect("static numbering pattern"))
}

/// Which layout a text blob uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    BareUrls,
    Players,
    NamedPairs,
}

fn is_url_line(line: &str) -> bool {
    line.starts_with("http://") || line.starts_with("https://")
}

fn content_lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

pub fn detect_format(text: &str) -> InputFormat {
    let lines = content_lines(text);
    if lines.iter().any(|l| l.starts_with('@')) {
        return InputFormat::Players;
    }
    let alternating = !lines.is_empty()
        && lines.len() % 2 == 0
        && lines
            .chunks(2)
            .all(|pair| !is_url_line(pair[0]) && is_url_line(pair[1]));
    if alternating {
        InputFormat::NamedPairs
    } else {
        InputFormat::BareUrls
    }
}

/// Parses `text` into jobs, in input order.
pub fn parse_jobs(text: &str) -> Vec<Job> {
    let format = detect_format(text);
    tracing::debug!(?format, "parsing job list");
    match format {
        InputFormat::BareUrls => parse_bare_urls(text),
        InputFormat::Players => parse_players(text),
        InputFormat::NamedPairs => parse_named_pairs(text),
    }
}

/// Reads and parses a job file.
pub fn read_jobs(path: &Path) -> Result<Vec<Job>, SetupError> {
    let text = std::fs::read_to_string(path).map_err(|source| SetupError::Input {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_jobs(&text))
}

fn parse_bare_urls(text: &str) -> Vec<Job> {
    clip_url_pattern()
        .find_iter(text)
        .filter_map(|m| build(Job::new(m.as_str())))
        .enumerate()
        .map(|(i, job)| job.with_order(i as u32 + 1))
        .collect()
}

fn parse_players(text: &str) -> Vec<Job> {
    let mut jobs = Vec::new();
    let mut pending_player: Option<&str> = None;

    for line in content_lines(text) {
        if let Some(player) = line.strip_prefix('@') {
            if let Some(prev) = pending_player {
                tracing::warn!("player @{} has no clip URL; skipped", prev);
            }
            pending_player = Some(player.trim());
            continue;
        }
        match pending_player.take() {
            Some(player) if is_url_line(line) => {
                let order = jobs.len() as u32 + 1;
                if let Some(job) = build(Job::new(line)) {
                    jobs.push(job.with_order(order).with_player(player));
                }
            }
            Some(player) => {
                tracing::warn!("expected URL after @{}, got {:?}; skipped", player, line)
            }
            None => tracing::warn!("line without preceding @player: {:?}; skipped", line),
        }
    }
    if let Some(player) = pending_player {
        tracing::warn!("player @{} has no clip URL; skipped", player);
    }
    jobs
}

fn parse_named_pairs(text: &str) -> Vec<Job> {
    let lines = content_lines(text);
    let mut jobs = Vec::new();
    for pair in lines.chunks(2) {
        let [name, url] = pair else {
            continue;
        };
        let Some(job) = build(Job::new(*url)) else {
            continue;
        };
        let index = jobs.len() + 1;
        let title = leading_number_pattern().replace(name, "").trim().to_string();
        let title = if title.is_empty() {
            clip_slug(job.source_url()).unwrap_or_default()
        } else {
            title
        };
        jobs.push(job.with_name(format!("{}. {}", index, title)));
    }
    jobs
}

fn build(result: Result<Job, crate::job::JobError>) -> Option<Job> {
    match result {
        Ok(job) => Some(job),
        Err(e) => {
            tracing::warn!("skipping entry: {}", e);
            None
        }
    }
}
