//! Per-fetcher request options.

use std::time::Duration;

use super::retry::RetryPolicy;
use crate::cache::DEFAULT_MEMORY_TTL;
use crate::config::Config;

// == Fetch Options ==
/// Describes one logical fetcher.
///
/// Cache keys are shared by convention across the process, so pick
/// collision-free ones such as `"<resource>-<page>-<filter>"`.
#[derive(Debug, Clone)]
pub struct FetchOptions<T> {
    /// Key for both cache tiers; `None` disables caching entirely
    pub cache_key: Option<String>,
    /// Attempts and backoff for the data operation
    pub retry: RetryPolicy,
    /// Value served when nothing better is available
    pub fallback: Option<T>,
    /// Expiry for both tiers; when unset, memory uses `memory_ttl` and the
    /// durable store its own default
    pub expiry: Option<Duration>,
    /// Memory expiry used when `expiry` is unset
    pub memory_ttl: Duration,
}

impl<T> Default for FetchOptions<T> {
    fn default() -> Self {
        Self {
            cache_key: None,
            retry: RetryPolicy::default(),
            fallback: None,
            expiry: None,
            memory_ttl: DEFAULT_MEMORY_TTL,
        }
    }
}

impl<T> FetchOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options seeded with the configured retry and memory defaults.
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy::from_config(config),
            memory_ttl: config.memory_ttl(),
            ..Self::default()
        }
    }

    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Total attempts. Use 1 for operations that must not be repeated.
    pub fn with_retry_count(mut self, attempts: u32) -> Self {
        self.retry.attempts = attempts;
        self
    }

    pub fn with_retry_delay(mut self, base_delay: Duration) -> Self {
        self.retry.base_delay = base_delay;
        self
    }

    pub fn with_fallback(mut self, fallback: T) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Expiry applied to memory cache entries.
    pub fn memory_expiry(&self) -> Duration {
        self.expiry.unwrap_or(self.memory_ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options: FetchOptions<String> = FetchOptions::new();
        assert!(options.cache_key.is_none());
        assert_eq!(options.retry.attempts, 3);
        assert!(options.fallback.is_none());
        assert_eq!(options.memory_expiry(), Duration::from_secs(300));
    }

    #[test]
    fn test_builder() {
        let options = FetchOptions::new()
            .with_cache_key("qa-1-answered")
            .with_retry_count(1)
            .with_fallback(Vec::<u32>::new())
            .with_expiry(Duration::from_secs(10));

        assert_eq!(options.cache_key.as_deref(), Some("qa-1-answered"));
        assert_eq!(options.retry.attempts, 1);
        assert_eq!(options.fallback, Some(vec![]));
        assert_eq!(options.memory_expiry(), Duration::from_secs(10));
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            retry_count: 5,
            retry_delay_ms: 250,
            memory_ttl_ms: 2000,
            ..Config::default()
        };
        let options: FetchOptions<u8> = FetchOptions::from_config(&config);

        assert_eq!(options.retry, RetryPolicy::new(5, Duration::from_millis(250)));
        assert_eq!(options.memory_expiry(), Duration::from_secs(2));
    }
}
