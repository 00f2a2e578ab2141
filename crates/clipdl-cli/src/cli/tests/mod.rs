//! CLI parse tests.

use super::{BackendArg, Cli};
use clap::Parser;
use clipdl_core::config::{ClipConfig, ResolverBackend};

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

#[test]
fn cli_parse_minimal() {
    let cli = parse(&["clipdl", "--input", "clips.txt", "--output", "out"]);
    assert_eq!(cli.input.to_str(), Some("clips.txt"));
    assert_eq!(cli.output.to_str(), Some("out"));
    assert!(cli.threads.is_none());
    assert!(cli.resolver.is_none());
    assert!(!cli.overwrite);
}

#[test]
fn cli_parse_all_flags() {
    let cli = parse(&[
        "clipdl",
        "-i",
        "list.txt",
        "-o",
        "/tmp/clips",
        "-t",
        "8",
        "--resolver",
        "html",
        "--browser-url",
        "ws://127.0.0.1:9222/devtools/browser/abc",
        "--timeout",
        "20",
        "--overwrite",
    ]);
    assert_eq!(cli.threads, Some(8));
    assert_eq!(cli.resolver, Some(BackendArg::Html));
    assert_eq!(
        cli.browser_url.as_deref(),
        Some("ws://127.0.0.1:9222/devtools/browser/abc")
    );
    assert_eq!(cli.timeout, Some(20));
    assert!(cli.overwrite);
}

#[test]
fn cli_requires_input_and_output() {
    assert!(Cli::try_parse_from(["clipdl", "--output", "out"]).is_err());
    assert!(Cli::try_parse_from(["clipdl", "--input", "clips.txt"]).is_err());
}

#[test]
fn cli_rejects_zero_threads_and_unknown_backend() {
    assert!(Cli::try_parse_from(["clipdl", "-i", "a", "-o", "b", "--threads", "0"]).is_err());
    assert!(
        Cli::try_parse_from(["clipdl", "-i", "a", "-o", "b", "--resolver", "selenium"]).is_err()
    );
}

#[test]
fn flags_override_config() {
    let cli = parse(&[
        "clipdl", "-i", "a", "-o", "b", "-t", "2", "--resolver", "html", "--timeout", "3",
        "--overwrite",
    ]);
    let mut cfg = ClipConfig::default();
    cli.apply_to(&mut cfg);
    assert_eq!(cfg.threads, 2);
    assert_eq!(cfg.resolver, ResolverBackend::Html);
    assert_eq!(cfg.resolve_timeout_secs, 3);
    assert!(cfg.overwrite);
}

#[test]
fn absent_flags_keep_config() {
    let cli = parse(&["clipdl", "-i", "a", "-o", "b"]);
    let mut cfg = ClipConfig {
        threads: 7,
        overwrite: true,
        ..ClipConfig::default()
    };
    cli.apply_to(&mut cfg);
    assert_eq!(cfg.threads, 7);
    assert!(cfg.overwrite);
    assert_eq!(cfg.resolver, ResolverBackend::Browser);
    assert!(cfg.browser_url.is_none());
}

#[test]
fn browser_url_flag_sets_config() {
    let cli = parse(&[
        "clipdl", "-i", "a", "-o", "b", "--resolver", "browser", "--browser-url", "ws://h:1/x",
    ]);
    let mut cfg = ClipConfig::default();
    cli.apply_to(&mut cfg);
    assert_eq!(cfg.resolver, ResolverBackend::Browser);
    assert_eq!(cfg.browser_url.as_deref(), Some("ws://h:1/x"));
}
