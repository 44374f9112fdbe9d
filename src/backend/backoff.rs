//! Exponential backoff with additive jitter for rate-limited calls.
//!
//! [`BackoffConfig`] decides how long to wait before retrying a call that the
//! provider rejected with a rate-limit signal. The wait before retry `n`
//! (0-indexed) is `base_delay * multiplier^n` plus a random jitter in
//! `[0, max_jitter)`.

use std::time::Duration;

/// Configuration for rate-limit retry.
///
/// # Example
///
/// ```
/// use brand_frames::backend::BackoffConfig;
/// use std::time::Duration;
///
/// let standard = BackoffConfig::standard();
/// assert_eq!(standard.max_retries, 3);
///
/// let (low, high) = standard.delay_bounds(2);
/// assert_eq!(low, Duration::from_secs(4));
/// assert_eq!(high, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    /// Retries after the initial call. Default: 3.
    pub max_retries: u32,

    /// Delay before the first retry, before jitter. Default: 1 second.
    pub base_delay: Duration,

    /// Growth factor per retry. Default: 2.0.
    pub multiplier: f64,

    /// Upper bound (exclusive) of the random jitter added to every delay.
    /// Default: 1 second.
    pub max_jitter: Duration,
}

impl BackoffConfig {
    /// 3 retries, waiting `2^attempt` seconds plus up to 1 second of jitter.
    pub fn standard() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            multiplier: 2.0,
            max_jitter: Duration::from_secs(1),
        }
    }

    /// No retry at all; the first failure propagates.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::standard()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_jitter(mut self, jitter: Duration) -> Self {
        self.max_jitter = jitter;
        self
    }

    /// Exponential part of the delay before retry `attempt` (0-indexed).
    pub fn base_delay_for_attempt(&self, attempt: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32);
        Duration::from_secs_f64(secs)
    }

    /// `[low, high)` range the delay before retry `attempt` falls in.
    pub fn delay_bounds(&self, attempt: u32) -> (Duration, Duration) {
        let low = self.base_delay_for_attempt(attempt);
        (low, low + self.max_jitter)
    }

    /// Delay before retry `attempt` (0-indexed), jitter included.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let jitter = self.max_jitter.as_secs_f64() * fastrand::f64();
        self.base_delay_for_attempt(attempt) + Duration::from_secs_f64(jitter)
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_delay_exponential() {
        let config = BackoffConfig::standard();
        assert_eq!(config.base_delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.base_delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.base_delay_for_attempt(2), Duration::from_secs(4));
        assert_eq!(config.base_delay_for_attempt(3), Duration::from_secs(8));
    }

    #[test]
    fn test_jitter_within_one_second() {
        let config = BackoffConfig::standard();
        for attempt in 0..3 {
            let (low, high) = config.delay_bounds(attempt);
            for _ in 0..100 {
                let d = config.delay_for_attempt(attempt);
                assert!(d >= low && d <= high, "delay {:?} outside [{:?}, {:?}]", d, low, high);
            }
        }
    }

    #[test]
    fn test_bounds_strictly_increase() {
        let config = BackoffConfig::standard();
        let (low0, high0) = config.delay_bounds(0);
        let (low1, high1) = config.delay_bounds(1);
        assert!(low1 > low0);
        assert!(high1 > high0);
    }

    #[test]
    fn test_no_jitter() {
        let config = BackoffConfig::standard().with_max_jitter(Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
    }

    #[test]
    fn test_none_preset() {
        assert_eq!(BackoffConfig::none().max_retries, 0);
        assert_eq!(BackoffConfig::default().max_retries, 3);
    }
}
