use std::time::Duration;

use crate::config::FetchConfig;
use crate::error::AlmError;

/// Retry and throttling policy for suite retrieval.
///
/// Passed explicitly to the client and the orchestrator; built from the
/// `[fetch]` config section.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per suite, including the first one
    pub max_attempts: u32,
    /// Base delay; retry `n` waits `backoff_factor * 2^(n-1)`
    pub backoff_factor: Duration,
    pub max_backoff: Duration,
    /// HTTP statuses treated as transient
    pub retry_statuses: Vec<u16>,
    pub request_timeout: Duration,
    /// Minimum spacing between two requests
    pub request_spacing: Duration,
    /// Suites in flight at once
    pub max_concurrent: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&FetchConfig::default())
    }
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff_factor: Duration::from_millis(config.backoff_factor_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            retry_statuses: config.retry_statuses.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            request_spacing: Duration::from_millis(config.delay_between_requests_ms),
            max_concurrent: config.max_concurrent.max(1),
        }
    }
}

impl RetryPolicy {
    /// Only timeouts and the configured statuses are transient.
    pub fn is_retryable(&self, error: &AlmError) -> bool {
        match error {
            AlmError::Timeout => true,
            AlmError::Api { status, .. } => self.retry_statuses.contains(status),
            _ => false,
        }
    }

    /// Delay before the retry that follows failed attempt `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.backoff_factor
            .saturating_mul(1 << exponent)
            .min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> AlmError {
        AlmError::Api {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn timeouts_and_configured_statuses_are_retryable() {
        let policy = RetryPolicy::default();

        assert!(policy.is_retryable(&AlmError::Timeout));
        for status in [429, 500, 502, 503, 504] {
            assert!(policy.is_retryable(&api_error(status)), "{status}");
        }
    }

    #[test]
    fn other_failures_are_permanent() {
        let policy = RetryPolicy::default();

        assert!(!policy.is_retryable(&api_error(404)));
        assert!(!policy.is_retryable(&api_error(401)));
        assert!(!policy.is_retryable(&AlmError::MalformedResponse("eof".into())));
    }

    #[test]
    fn retry_statuses_follow_config() {
        let config = FetchConfig {
            retry_statuses: vec![418],
            ..FetchConfig::default()
        };
        let policy = RetryPolicy::from(&config);

        assert!(policy.is_retryable(&api_error(418)));
        assert!(!policy.is_retryable(&api_error(503)));
    }

    #[test]
    fn backoff_grows_and_is_capped() {
        let policy = RetryPolicy {
            backoff_factor: Duration::from_secs(1),
            max_backoff: Duration::from_secs(5),
            ..RetryPolicy::default()
        };

        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(5));
        assert_eq!(policy.backoff(40), Duration::from_secs(5));
    }

    #[test]
    fn zero_attempts_and_concurrency_are_clamped() {
        let config = FetchConfig {
            max_attempts: 0,
            max_concurrent: 0,
            ..FetchConfig::default()
        };
        let policy = RetryPolicy::from(&config);

        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_concurrent, 1);
    }
}
