//! Retry classification and backoff delays
//!
//! Lookups retry on a fresh credential after every provider failure. How long
//! to wait depends on the failure: a rate limit waits a fixed delay, a timeout
//! waits a short fixed delay, and everything else backs off linearly in the
//! attempt number with random jitter so that concurrent workers spread out.

use crate::config::LookupConfig;
use crate::provider::ProviderError;
use rand::Rng;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (rate limits, server errors, timeouts, connection resets)
/// should return `true`. Failures that would repeat identically on another
/// credential should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for ProviderError {
    fn is_retryable(&self) -> bool {
        match self {
            // Another credential may not be throttled
            ProviderError::RateLimited => true,
            // Any other non-200 is treated as transient
            ProviderError::Status(_) => true,
            // A garbled body may be a one-off
            ProviderError::Malformed(_) => true,
            ProviderError::Timeout => true,
            ProviderError::Network(_) => true,
            // The request could not even be built
            ProviderError::InvalidRequest(_) => false,
        }
    }
}

/// Delay before the next attempt after `error`
///
/// `attempt` is the number of attempts made so far (1 after the first failure).
pub fn retry_delay(error: &ProviderError, attempt: u32, config: &LookupConfig) -> Duration {
    match error {
        ProviderError::RateLimited => config.rate_limit_delay,
        ProviderError::Timeout => config.timeout_delay,
        ProviderError::Network(_) => jittered_backoff(config.network_backoff_base, attempt),
        ProviderError::Status(_) | ProviderError::Malformed(_) => {
            jittered_backoff(config.backoff_base, attempt)
        }
        ProviderError::InvalidRequest(_) => Duration::ZERO,
    }
}

/// `base × (attempt + U[0,1))`
pub fn jittered_backoff(base: Duration, attempt: u32) -> Duration {
    let factor = attempt as f64 + rand::thread_rng().gen_range(0.0..1.0);
    Duration::from_secs_f64(base.as_secs_f64() * factor)
}

/// Uniform random delay in `[min, max)`; `min` when the range is empty
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    if min >= max {
        return min;
    }
    let secs = rand::thread_rng().gen_range(min.as_secs_f64()..max.as_secs_f64());
    Duration::from_secs_f64(secs)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jittered_backoff_stays_within_attempt_window() {
        let base = Duration::from_millis(300);
        for _ in 0..100 {
            let delay = jittered_backoff(base, 1);
            assert!(delay >= Duration::from_millis(300), "{delay:?} too short");
            assert!(delay < Duration::from_millis(600), "{delay:?} too long");

            let delay = jittered_backoff(base, 2);
            assert!(delay >= Duration::from_millis(600));
            assert!(delay < Duration::from_millis(900));
        }
    }

    #[test]
    fn random_delay_respects_half_open_range() {
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(200);
        for _ in 0..100 {
            let delay = random_delay(min, max);
            assert!(delay >= min && delay < max, "{delay:?} out of range");
        }
    }

    #[test]
    fn random_delay_with_empty_range_returns_min() {
        let d = Duration::from_millis(50);
        assert_eq!(random_delay(d, d), d);
        assert_eq!(random_delay(d, Duration::ZERO), d);
    }

    #[test]
    fn fixed_delays_for_rate_limit_and_timeout() {
        let config = LookupConfig::default();
        assert_eq!(
            retry_delay(&ProviderError::RateLimited, 1, &config),
            Duration::from_secs(1)
        );
        assert_eq!(
            retry_delay(&ProviderError::Timeout, 1, &config),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn network_errors_back_off_longer_than_status_errors() {
        let config = LookupConfig::default();
        let network = retry_delay(&ProviderError::Network("reset".into()), 1, &config);
        assert!(network >= Duration::from_millis(500) && network < Duration::from_secs(1));

        let status = retry_delay(&ProviderError::Status(500), 1, &config);
        assert!(status >= Duration::from_millis(300) && status < Duration::from_millis(600));
    }

    #[test]
    fn only_unbuildable_requests_are_permanent() {
        assert!(ProviderError::RateLimited.is_retryable());
        assert!(ProviderError::Status(503).is_retryable());
        assert!(ProviderError::Malformed("eof".into()).is_retryable());
        assert!(ProviderError::Timeout.is_retryable());
        assert!(ProviderError::Network("refused".into()).is_retryable());
        assert!(!ProviderError::InvalidRequest("bad url".into()).is_retryable());
    }
}
