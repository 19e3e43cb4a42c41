//! Configuration Module
//!
//! Handles loading fetch-layer defaults from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Fetch layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the durable cache database
    pub cache_path: PathBuf,
    /// Default memory cache expiry in milliseconds
    pub memory_ttl_ms: u64,
    /// Default durable cache TTL in milliseconds
    pub persistent_ttl_ms: u64,
    /// Default number of attempts for a data operation
    pub retry_count: u32,
    /// Backoff unit in milliseconds (attempt N waits N units)
    pub retry_delay_ms: u64,
    /// Periodic sweep interval in seconds, 0 disables it
    pub cleanup_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_PATH` - Durable store file (default: `<data_dir>/offline_fetch/cache.db`)
    /// - `MEMORY_TTL_MS` - Memory expiry (default: 300000)
    /// - `PERSISTENT_TTL_MS` - Durable TTL (default: 3600000)
    /// - `RETRY_COUNT` - Attempts per operation (default: 3)
    /// - `RETRY_DELAY_MS` - Backoff unit (default: 1000)
    /// - `CLEANUP_INTERVAL` - Sweep frequency in seconds (default: 300)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_path: env::var("CACHE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_path),
            memory_ttl_ms: parse_var("MEMORY_TTL_MS").unwrap_or(defaults.memory_ttl_ms),
            persistent_ttl_ms: parse_var("PERSISTENT_TTL_MS")
                .unwrap_or(defaults.persistent_ttl_ms),
            retry_count: parse_var("RETRY_COUNT").unwrap_or(defaults.retry_count),
            retry_delay_ms: parse_var("RETRY_DELAY_MS").unwrap_or(defaults.retry_delay_ms),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
        }
    }

    /// Memory cache expiry as a Duration.
    pub fn memory_ttl(&self) -> Duration {
        Duration::from_millis(self.memory_ttl_ms)
    }

    /// Durable cache TTL as a Duration.
    pub fn persistent_ttl(&self) -> Duration {
        Duration::from_millis(self.persistent_ttl_ms)
    }

    /// Backoff unit as a Duration.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Default database location under the platform data directory.
    pub fn default_cache_path() -> PathBuf {
        dirs::data_dir()
            .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
            .unwrap_or_else(env::temp_dir)
            .join("offline_fetch")
            .join("cache.db")
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: Self::default_cache_path(),
            memory_ttl_ms: 5 * 60 * 1000,
            persistent_ttl_ms: 60 * 60 * 1000,
            retry_count: 3,
            retry_delay_ms: 1000,
            cleanup_interval: 300,
        }
    }
}
