use crate::config::RetrySection;
use rand::Rng;
use std::time::Duration;

/// Exponential backoff policy with jitter
///
/// Shared read-only by every task in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Interval before the first retry
    pub min_interval: Duration,
    /// Upper bound on the un-jittered interval
    pub max_interval: Duration,
    /// Relative jitter in [0, 1]; 0.05 means ±5%
    pub jitter_factor: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(60),
            jitter_factor: 0.05,
        }
    }
}

impl From<&RetrySection> for BackoffPolicy {
    fn from(section: &RetrySection) -> Self {
        Self {
            max_retries: section.max_retries,
            min_interval: Duration::from_millis(section.min_interval_ms),
            max_interval: Duration::from_millis(section.max_interval_ms),
            jitter_factor: section.jitter_factor.clamp(0.0, 1.0),
        }
    }
}

impl BackoffPolicy {
    /// Total attempts a task may make, first attempt included
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Un-jittered interval before retry `retry` (1-based)
    ///
    /// `min_interval * 2^(retry - 1)`, capped at `max_interval`.
    pub fn interval(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(31);
        self.min_interval
            .saturating_mul(1u32 << exp)
            .min(self.max_interval)
    }

    /// Inclusive bounds the jittered interval for `retry` falls within
    pub fn delay_bounds(&self, retry: u32) -> (Duration, Duration) {
        let interval = self.interval(retry);
        (
            interval.mul_f64((1.0 - self.jitter_factor).max(0.0)),
            interval.mul_f64(1.0 + self.jitter_factor),
        )
    }

    /// Interval before retry `retry`, jittered by up to ±`jitter_factor`
    pub fn jittered_interval<R: Rng + ?Sized>(&self, retry: u32, rng: &mut R) -> Duration {
        let interval = self.interval(retry);
        if self.jitter_factor <= 0.0 {
            return interval;
        }

        let offset = rng.gen_range(-self.jitter_factor..=self.jitter_factor);
        interval.mul_f64((1.0 + offset).max(0.0))
    }
}
