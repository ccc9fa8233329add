//! Command-line overrides for the retry policy from config.toml.

use clap::{Args, ValueEnum};
use retrier_core::config::{BackoffConfig, RetrierConfig};

const DEFAULT_MAX_INTERVAL_MS: u64 = 30_000;
const DEFAULT_JITTER: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Constant,
    Exponential,
    /// Exponential with random jitter.
    Jitter,
    Linear,
}

/// Policy flags shared by commands that retry. Unset flags keep the config value.
#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Maximum number of attempts, including the first.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
    /// Backoff strategy between attempts.
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,
    /// Base backoff interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,
    /// Upper bound on the backoff interval in milliseconds.
    #[arg(long, value_name = "MS")]
    pub max_interval_ms: Option<u64>,
    /// Jitter fraction for the jitter strategy (0.0 to 1.0).
    #[arg(long, value_name = "F")]
    pub jitter: Option<f64>,
    /// Give up after this many seconds in total, even while waiting.
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,
    /// Only retry when the command exits with this code (repeatable).
    #[arg(long = "retry-exit-code", value_name = "CODE")]
    pub retry_exit_codes: Vec<i32>,
}

impl PolicyArgs {
    /// Config with these overrides applied on top of `cfg`.
    pub fn apply(&self, cfg: &RetrierConfig) -> RetrierConfig {
        let mut out = cfg.clone();
        if let Some(n) = self.max_attempts {
            out.retry.max_attempts = n;
        }
        if self.timeout_secs.is_some() {
            out.retry.timeout_secs = self.timeout_secs;
        }
        if !self.retry_exit_codes.is_empty() {
            out.retry_exit_codes = self.retry_exit_codes.clone();
        }
        out.retry.backoff = self.merge_backoff(&cfg.retry.backoff);
        out
    }

    fn merge_backoff(&self, base: &BackoffConfig) -> BackoffConfig {
        let (strategy, interval_ms, max_interval_ms, jitter) = match *base {
            BackoffConfig::Constant { interval_ms } => (Strategy::Constant, interval_ms, None, None),
            BackoffConfig::Exponential {
                interval_ms,
                max_interval_ms,
            } => (Strategy::Exponential, interval_ms, Some(max_interval_ms), None),
            BackoffConfig::ExponentialJitter {
                interval_ms,
                max_interval_ms,
                jitter,
            } => (Strategy::Jitter, interval_ms, Some(max_interval_ms), Some(jitter)),
            BackoffConfig::Linear {
                interval_ms,
                max_interval_ms,
            } => (Strategy::Linear, interval_ms, Some(max_interval_ms), None),
        };

        let strategy = self.strategy.unwrap_or(strategy);
        let interval_ms = self.interval_ms.unwrap_or(interval_ms);
        let max_interval_ms = self
            .max_interval_ms
            .or(max_interval_ms)
            .unwrap_or(DEFAULT_MAX_INTERVAL_MS);
        let jitter = self.jitter.or(jitter).unwrap_or(DEFAULT_JITTER);

        match strategy {
            Strategy::Constant => BackoffConfig::Constant { interval_ms },
            Strategy::Exponential => BackoffConfig::Exponential {
                interval_ms,
                max_interval_ms,
            },
            Strategy::Jitter => BackoffConfig::ExponentialJitter {
                interval_ms,
                max_interval_ms,
                jitter,
            },
            Strategy::Linear => BackoffConfig::Linear {
                interval_ms,
                max_interval_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_flags_keeps_config() {
        let cfg = RetrierConfig::default();
        assert_eq!(PolicyArgs::default().apply(&cfg), cfg);
    }

    #[test]
    fn strategy_switch_keeps_interval() {
        let mut cfg = RetrierConfig::default();
        cfg.retry.backoff = BackoffConfig::Constant { interval_ms: 250 };
        let args = PolicyArgs {
            strategy: Some(Strategy::Exponential),
            ..Default::default()
        };
        assert_eq!(
            args.apply(&cfg).retry.backoff,
            BackoffConfig::Exponential {
                interval_ms: 250,
                max_interval_ms: DEFAULT_MAX_INTERVAL_MS
            }
        );
    }

    #[test]
    fn jitter_flags_override_config() {
        let mut cfg = RetrierConfig::default();
        cfg.retry.backoff = BackoffConfig::ExponentialJitter {
            interval_ms: 100,
            max_interval_ms: 5000,
            jitter: 0.2,
        };
        let args = PolicyArgs {
            jitter: Some(0.5),
            max_interval_ms: Some(800),
            max_attempts: Some(6),
            timeout_secs: Some(10),
            retry_exit_codes: vec![75],
            ..Default::default()
        };
        let out = args.apply(&cfg);
        assert_eq!(
            out.retry.backoff,
            BackoffConfig::ExponentialJitter {
                interval_ms: 100,
                max_interval_ms: 800,
                jitter: 0.5
            }
        );
        assert_eq!(out.retry.max_attempts, 6);
        assert_eq!(out.retry.timeout_secs, Some(10));
        assert_eq!(out.retry_exit_codes, vec![75]);
    }
}
