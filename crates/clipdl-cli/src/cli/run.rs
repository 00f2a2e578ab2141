//! Wires config into resolver, fetcher and orchestrator, and handles Ctrl-C.

use anyhow::Result;
use clipdl_core::batch::{BatchOptions, BatchOrchestrator, BatchReport, BatchStatus, JobOutcome};
use clipdl_core::config::{ClipConfig, ResolverBackend};
use clipdl_core::control::CancelToken;
use clipdl_core::fetcher::CurlFetcher;
use clipdl_core::input;
use clipdl_core::resolver::{BrowserResolver, HtmlPageResolver, PageResolver};
use clipdl_core::sink::TracingSink;
use std::path::Path;
use std::sync::Arc;

use super::EXIT_CANCELLED;

pub fn build_resolver(cfg: &ClipConfig) -> Arc<dyn PageResolver> {
    match cfg.resolver {
        ResolverBackend::Browser => Arc::new(BrowserResolver::new(cfg.browser_settings())),
        ResolverBackend::Html => Arc::new(HtmlPageResolver::new(
            cfg.resolve_timeout(),
            cfg.connect_timeout(),
            cfg.user_agent.clone(),
        )),
    }
}

pub async fn run_batch(cfg: &ClipConfig, input_path: &Path, output_dir: &Path) -> Result<i32> {
    let jobs = input::read_jobs(input_path)?;
    if jobs.is_empty() {
        println!("No clip URLs found in {}", input_path.display());
        return Ok(0);
    }
    println!("{} clip(s) queued, {} at a time", jobs.len(), cfg.threads.max(1));

    let cancel = CancelToken::new();
    let orchestrator = BatchOrchestrator::new(
        build_resolver(cfg),
        Arc::new(CurlFetcher::new(cfg.fetch_settings())),
        Arc::new(TracingSink),
        BatchOptions {
            workers: cfg.threads,
        },
    )
    .with_cancel_token(cancel.clone());

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received; finishing clips in progress, starting no new ones");
            cancel.cancel();
        }
    });

    let result = orchestrator.run(jobs, output_dir).await;
    ctrl_c.abort();
    let report = result?;

    print_summary(&report);
    Ok(match report.status {
        BatchStatus::Completed => 0,
        BatchStatus::Cancelled => EXIT_CANCELLED,
    })
}

fn print_summary(report: &BatchReport) {
    let summary = report.summary();
    println!(
        "Done: {} succeeded, {} failed, {} skipped",
        summary.succeeded, summary.failed, summary.skipped
    );
    let failed: Vec<_> = report.failed().collect();
    if !failed.is_empty() {
        println!("Failed:");
        for result in failed {
            match &result.outcome {
                JobOutcome::Failure(reason) => println!("  {}: {}", result.job.label(), reason),
                JobOutcome::Success { .. } => {}
            }
        }
    }
    if report.status == BatchStatus::Cancelled {
        println!("Cancelled by user");
    }
}
