//! Integration test: browser resolver called from batch worker threads.
//!
//! Tests marked `ignore` drive a real headless Chrome; run them with
//! `cargo test -- --ignored` on a machine that has one installed.

mod common;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clipdl_core::batch::{BatchOptions, BatchOrchestrator, BatchStatus};
use clipdl_core::fetcher::CurlFetcher;
use clipdl_core::job::Job;
use clipdl_core::resolver::{BrowserResolver, BrowserSettings, PageResolver, ResolveError};
use clipdl_core::sink::MemorySink;
use tempfile::tempdir;

fn resolver(max_idle: usize) -> BrowserResolver {
    BrowserResolver::new(BrowserSettings {
        timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
        max_idle_browsers: max_idle,
        ..BrowserSettings::default()
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn launch_failure_inside_a_worker_is_a_transport_error() {
    let resolver = Arc::new(BrowserResolver::new(BrowserSettings {
        chrome_path: Some(PathBuf::from("/nonexistent/chrome")),
        launch_timeout: Duration::from_secs(2),
        ..BrowserSettings::default()
    }));

    let worker = Arc::clone(&resolver);
    let result = tokio::task::spawn_blocking(move || {
        worker.resolve("https://twitch.tv/chan/clip/Slug")
    })
    .await
    .unwrap();

    assert!(matches!(result, Err(ResolveError::Transport(_))));
    assert_eq!(resolver.pool().idle_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a local Chrome"]
async fn sequential_resolutions_reuse_one_browser() {
    let clips = common::clip_server::start(HashMap::new());
    let resolver = resolver(2);

    for slug in ["One", "Two"] {
        let media = resolver
            .resolve_async(&clips.clip_url("chan", slug))
            .await
            .unwrap();
        assert_eq!(media, clips.media_url(slug));
        assert_eq!(resolver.pool().idle_count(), 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a local Chrome"]
async fn page_without_video_times_out_and_keeps_the_browser() {
    let clips = common::clip_server::start(HashMap::new());
    let resolver = BrowserResolver::new(BrowserSettings {
        timeout: Duration::from_secs(1),
        poll_interval: Duration::from_millis(50),
        ..BrowserSettings::default()
    });

    let err = resolver
        .resolve_async(&clips.clip_url("chan", "nomedia1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::Timeout));
    assert_eq!(resolver.pool().idle_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[ignore = "needs a local Chrome"]
async fn batch_through_browser_downloads_every_clip() {
    let mut media = HashMap::new();
    for slug in ["B1", "B2", "B3"] {
        media.insert(slug.to_string(), slug.repeat(1000).into_bytes());
    }
    let clips = common::clip_server::start(media.clone());

    let jobs: Vec<Job> = ["B1", "B2", "B3"]
        .iter()
        .enumerate()
        .map(|(i, slug)| {
            Job::new(clips.clip_url("chan", slug))
                .unwrap()
                .with_order(i as u32 + 1)
                .with_player(format!("p{}", i + 1))
        })
        .collect();

    let out = tempdir().unwrap();
    let orchestrator = BatchOrchestrator::new(
        Arc::new(resolver(2)),
        Arc::new(CurlFetcher::default()),
        Arc::new(MemorySink::new()),
        BatchOptions { workers: 2 },
    );
    let report = orchestrator.run(jobs, out.path()).await.unwrap();

    assert_eq!(report.status, BatchStatus::Completed);
    assert_eq!(report.summary().succeeded, 3);
    for (i, slug) in ["B1", "B2", "B3"].iter().enumerate() {
        let path = out.path().join(format!("{}@p{}.mp4", i + 1, i + 1));
        assert_eq!(std::fs::read(path).unwrap(), media[*slug]);
    }
}
