//! Backoff strategies: map a zero-based attempt index to a wait duration.
//!
//! All strategies are pure values that can be shared between any number of
//! concurrent retry loops. Only [`JitteredBackoff`] is non-deterministic.

use rand::Rng;
use std::time::Duration;

/// Computes how long to wait after a failed attempt.
///
/// `attempt` is 0-based: `delay(0)` is the wait between the first and the
/// second invocation. Implementations must not block.
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

impl<F> Backoff for F
where
    F: Fn(u32) -> Duration + Send + Sync,
{
    fn delay(&self, attempt: u32) -> Duration {
        self(attempt)
    }
}

/// Same interval for every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    pub interval: Duration,
}

impl Backoff for ConstantBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

/// `interval * 2^attempt`, capped at `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    pub interval: Duration,
    pub max_interval: Duration,
}

impl Backoff for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        doubled(self.interval, attempt).min(self.max_interval)
    }
}

/// Exponential backoff with a uniformly random reduction of up to `jitter`
/// (a fraction in `[0, 1]`) of the capped delay.
///
/// The result lies in `[backoff * (1 - jitter), backoff]` where `backoff` is
/// the [`ExponentialBackoff`] value for the same attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitteredBackoff {
    pub interval: Duration,
    pub max_interval: Duration,
    jitter: f64,
}

impl JitteredBackoff {
    pub fn new(interval: Duration, max_interval: Duration, jitter: f64) -> Self {
        let jitter = if jitter.is_nan() { 0.0 } else { jitter.clamp(0.0, 1.0) };
        Self {
            interval,
            max_interval,
            jitter,
        }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Backoff for JitteredBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let capped = doubled(self.interval, attempt).min(self.max_interval);
        let upper = u64::try_from(capped.as_nanos()).unwrap_or(u64::MAX);
        // Integer bounds keep the draw inside the ceiling regardless of float rounding.
        let span = ((upper as f64) * self.jitter) as u64;
        let lower = upper - span.min(upper);
        Duration::from_nanos(rand::thread_rng().gen_range(lower..=upper))
    }
}

/// `interval * (attempt + 1)`, capped at `max_interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBackoff {
    pub interval: Duration,
    pub max_interval: Duration,
}

impl Backoff for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        self.interval
            .saturating_mul(attempt.saturating_add(1))
            .min(self.max_interval)
    }
}

pub fn constant(interval: Duration) -> ConstantBackoff {
    ConstantBackoff { interval }
}

pub fn exponential(interval: Duration, max_interval: Duration) -> ExponentialBackoff {
    ExponentialBackoff {
        interval,
        max_interval,
    }
}

pub fn exponential_jitter(interval: Duration, max_interval: Duration, jitter: f64) -> JitteredBackoff {
    JitteredBackoff::new(interval, max_interval, jitter)
}

pub fn linear(interval: Duration, max_interval: Duration) -> LinearBackoff {
    LinearBackoff {
        interval,
        max_interval,
    }
}

/// `interval * 2^attempt`, saturating instead of overflowing.
fn doubled(interval: Duration, attempt: u32) -> Duration {
    let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
    interval.saturating_mul(factor)
}
