//! CLI for the clipdl batch clip downloader.

mod run;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use clipdl_core::config::{self, ClipConfig, ResolverBackend};
use std::path::PathBuf;

/// Exit code when the batch was stopped with Ctrl-C.
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// Headless Chrome over the DevTools protocol.
    Browser,
    /// Static page fetch, no browser.
    Html,
}

impl From<BackendArg> for ResolverBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Browser => ResolverBackend::Browser,
            BackendArg::Html => ResolverBackend::Html,
        }
    }
}

/// Download a list of clips into a directory.
#[derive(Debug, Parser)]
#[command(name = "clipdl")]
#[command(about = "clipdl: batch clip downloader", long_about = None)]
pub struct Cli {
    /// Text file with clip URLs (bare, `@player` + URL, or name + URL pairs).
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory the .mp4 files are written to (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub output: PathBuf,

    /// Clips processed concurrently [default: from config, 5].
    #[arg(short = 't', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub threads: Option<u16>,

    /// How clip pages are resolved to media URLs [default: from config].
    #[arg(long, value_enum)]
    pub resolver: Option<BackendArg>,

    /// DevTools websocket of a running browser instead of launching one.
    #[arg(long, value_name = "WS_URL")]
    pub browser_url: Option<String>,

    /// Seconds to wait for a page to expose its video.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Replace output files that already exist.
    #[arg(long)]
    pub overwrite: bool,
}

impl Cli {
    /// Command-line values take precedence over the config file.
    pub fn apply_to(&self, cfg: &mut ClipConfig) {
        if let Some(threads) = self.threads {
            cfg.threads = threads as usize;
        }
        if let Some(backend) = self.resolver {
            cfg.resolver = backend.into();
        }
        if let Some(url) = &self.browser_url {
            cfg.browser_url = Some(url.clone());
        }
        if let Some(secs) = self.timeout {
            cfg.resolve_timeout_secs = secs;
        }
        if self.overwrite {
            cfg.overwrite = true;
        }
    }

    /// Parses arguments, runs the batch, and returns the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        cli.apply_to(&mut cfg);
        tracing::debug!("effective config: {:?}", cfg);

        run::run_batch(&cfg, &cli.input, &cli.output).await
    }
}

#[cfg(test)]
mod tests;
