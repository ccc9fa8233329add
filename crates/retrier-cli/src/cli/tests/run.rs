//! Tests for the run and config subcommands.

use super::parse;
use crate::cli::policy::Strategy;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_run_defaults() {
    match parse(&["retrier", "run", "--", "curl", "-f", "https://example.com"]) {
        CliCommand::Run { policy, program } => {
            assert_eq!(program, vec!["curl", "-f", "https://example.com"]);
            assert!(policy.max_attempts.is_none());
            assert!(policy.strategy.is_none());
            assert!(policy.timeout_secs.is_none());
            assert!(policy.retry_exit_codes.is_empty());
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_policy_flags() {
    match parse(&[
        "retrier",
        "run",
        "--max-attempts",
        "5",
        "--strategy",
        "jitter",
        "--interval-ms",
        "100",
        "--max-interval-ms",
        "5000",
        "--jitter",
        "0.3",
        "--timeout-secs",
        "30",
        "--retry-exit-code",
        "75",
        "--retry-exit-code",
        "111",
        "--",
        "make",
        "test",
    ]) {
        CliCommand::Run { policy, program } => {
            assert_eq!(program, vec!["make", "test"]);
            assert_eq!(policy.max_attempts, Some(5));
            assert_eq!(policy.strategy, Some(Strategy::Jitter));
            assert_eq!(policy.interval_ms, Some(100));
            assert_eq!(policy.max_interval_ms, Some(5000));
            assert_eq!(policy.jitter, Some(0.3));
            assert_eq!(policy.timeout_secs, Some(30));
            assert_eq!(policy.retry_exit_codes, vec![75, 111]);
        }
        _ => panic!("expected Run with policy flags"),
    }
}

#[test]
fn cli_parse_run_without_separator() {
    match parse(&["retrier", "run", "--strategy", "linear", "ping", "-c", "1", "host"]) {
        CliCommand::Run { policy, program } => {
            assert_eq!(policy.strategy, Some(Strategy::Linear));
            assert_eq!(program, vec!["ping", "-c", "1", "host"]);
        }
        _ => panic!("expected Run"),
    }
}

#[test]
fn cli_parse_run_requires_command() {
    assert!(Cli::try_parse_from(["retrier", "run"]).is_err());
}

#[test]
fn cli_parse_run_rejects_unknown_strategy() {
    assert!(Cli::try_parse_from(["retrier", "run", "--strategy", "fibonacci", "--", "true"]).is_err());
}

#[test]
fn cli_parse_config() {
    match parse(&["retrier", "config"]) {
        CliCommand::Config => {}
        _ => panic!("expected Config"),
    }
}
