//! Client configuration.

use std::time::Duration;

use reqwest::Method;

use sktrack_core::error::ApiError;
use sktrack_core::types::{ApiUrl, Environment};

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Settings fixed when an [`ApiClient`](crate::ApiClient) is built.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL. Chosen once; never re-evaluated per request.
    pub api_url: ApiUrl,
    /// Per-request timeout. A timeout is a network-class failure.
    pub timeout: Duration,
    /// Log request/response metadata (sanitized) at debug level.
    pub debug_logging: bool,
    /// Retries for network-class failures.
    pub retry: RetryPolicy,
}

impl ClientConfig {
    pub fn new(api_url: ApiUrl) -> Self {
        Self {
            api_url,
            timeout: DEFAULT_TIMEOUT,
            debug_logging: false,
            retry: RetryPolicy::default(),
        }
    }

    /// Defaults for a deployment: its base URL, and request logging only in
    /// development.
    pub fn for_environment(env: Environment) -> Self {
        Self {
            debug_logging: env.is_development(),
            ..Self::new(env.api_url())
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_debug_logging(mut self, enabled: bool) -> Self {
        self.debug_logging = enabled;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Capped retry for network-class failures.
///
/// Only failures where no response arrived (connection errors, timeouts)
/// are retried, and only for methods that are safe to repeat. A response
/// with any status, 4xx included, is never retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether attempt number `attempt` (zero-based) may be followed by another.
    pub fn should_retry(&self, method: &Method, attempt: u32, err: &ApiError) -> bool {
        attempt < self.max_retries && is_repeatable(method) && err.code().is_network()
    }

    /// Backoff before the retry following attempt `attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

fn is_repeatable(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
