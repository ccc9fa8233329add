use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::{self, Backoff};
use crate::cancel::CancelToken;
use crate::retry::{RetryOptions, DEFAULT_MAX_ATTEMPTS};

/// Backoff strategy as written in config.toml. Intervals are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum BackoffConfig {
    Constant {
        interval_ms: u64,
    },
    Exponential {
        interval_ms: u64,
        max_interval_ms: u64,
    },
    ExponentialJitter {
        interval_ms: u64,
        max_interval_ms: u64,
        /// Fraction of the delay that may be shaved off at random, 0.0..=1.0.
        jitter: f64,
    },
    Linear {
        interval_ms: u64,
        max_interval_ms: u64,
    },
}

impl Default for BackoffConfig {
    fn default() -> Self {
        BackoffConfig::Constant { interval_ms: 1000 }
    }
}

impl BackoffConfig {
    pub fn build(&self) -> Arc<dyn Backoff> {
        let ms = Duration::from_millis;
        match *self {
            BackoffConfig::Constant { interval_ms } => Arc::new(backoff::constant(ms(interval_ms))),
            BackoffConfig::Exponential {
                interval_ms,
                max_interval_ms,
            } => Arc::new(backoff::exponential(ms(interval_ms), ms(max_interval_ms))),
            BackoffConfig::ExponentialJitter {
                interval_ms,
                max_interval_ms,
                jitter,
            } => Arc::new(backoff::exponential_jitter(
                ms(interval_ms),
                ms(max_interval_ms),
                jitter,
            )),
            BackoffConfig::Linear {
                interval_ms,
                max_interval_ms,
            } => Arc::new(backoff::linear(ms(interval_ms), ms(max_interval_ms))),
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Retry policy parameters (the `[retry]` section of config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first). 0 falls back to the default.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Overall time limit for all attempts and waits, in seconds.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout_secs: None,
            backoff: BackoffConfig::default(),
        }
    }
}

impl RetryConfig {
    /// Runtime options for this policy. Every error stays retryable; callers
    /// add their own predicate and observer.
    pub fn to_options<E: 'static>(&self) -> RetryOptions<E> {
        RetryOptions::new()
            .with_max_attempts(self.max_attempts)
            .with_shared_backoff(self.backoff.build())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// A fresh token that fires after `timeout_secs`, or only on explicit cancel.
    pub fn cancel_token(&self) -> CancelToken {
        match self.timeout() {
            Some(timeout) => CancelToken::with_timeout(timeout),
            None => CancelToken::new(),
        }
    }
}

/// Global configuration loaded from `~/.config/retrier/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrierConfig {
    /// Exit codes `retrier run` treats as retryable. Empty = every non-zero code.
    #[serde(default)]
    pub retry_exit_codes: Vec<i32>,
    #[serde(default)]
    pub retry: RetryConfig,
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("retrier")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RetrierConfig> {
    load_or_init_at(&config_path()?)
}

/// Same as [`load_or_init`] for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<RetrierConfig> {
    if !path.exists() {
        let default_cfg = RetrierConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("writing {}", path.display()))?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(path)
}

pub fn load_from_path(path: &Path) -> Result<RetrierConfig> {
    let data =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let cfg: RetrierConfig =
        toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RetrierConfig::default();
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.backoff, BackoffConfig::Constant { interval_ms: 1000 });
        assert!(cfg.retry.timeout_secs.is_none());
        assert!(cfg.retry_exit_codes.is_empty());
    }

    #[test]
    fn config_toml_roundtrip() {
        let mut cfg = RetrierConfig::default();
        cfg.retry.timeout_secs = Some(30);
        cfg.retry.backoff = BackoffConfig::ExponentialJitter {
            interval_ms: 100,
            max_interval_ms: 5000,
            jitter: 0.2,
        };
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: RetrierConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: RetrierConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RetrierConfig::default());
    }

    #[test]
    fn config_toml_strategies() {
        let toml = r#"
            retry_exit_codes = [75, 111]

            [retry]
            max_attempts = 5
            timeout_secs = 60

            [retry.backoff]
            strategy = "linear"
            interval_ms = 200
            max_interval_ms = 1000
        "#;
        let cfg: RetrierConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.retry_exit_codes, vec![75, 111]);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(
            cfg.retry.backoff,
            BackoffConfig::Linear {
                interval_ms: 200,
                max_interval_ms: 1000
            }
        );

        let exp: BackoffConfig =
            toml::from_str("strategy = \"exponential\"\ninterval_ms = 50\nmax_interval_ms = 400")
                .unwrap();
        assert_eq!(exp.build().delay(10), Duration::from_millis(400));
    }

    #[test]
    fn to_options_applies_policy() {
        let retry = RetryConfig {
            max_attempts: 0,
            timeout_secs: None,
            backoff: BackoffConfig::Linear {
                interval_ms: 100,
                max_interval_ms: 250,
            },
        };
        let opts = retry.to_options::<String>();
        assert_eq!(opts.max_attempts(), DEFAULT_MAX_ATTEMPTS);
        assert_eq!(opts.backoff().delay(1), Duration::from_millis(200));
        assert_eq!(opts.backoff().delay(5), Duration::from_millis(250));
        assert!(!retry.cancel_token().is_cancelled());
    }

    #[test]
    fn load_or_init_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init_at(&path).unwrap();
        assert_eq!(cfg, RetrierConfig::default());
        assert!(path.exists());
        assert_eq!(load_from_path(&path).unwrap(), cfg);
    }

    #[test]
    fn load_from_path_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[retry]\nmax_attempts = \"many\"\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }
}
