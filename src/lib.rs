//! Offline Fetch - data freshness and offline resilience for a portfolio site
//!
//! Fetches data through a per-fetcher memory cache and a shared durable
//! cache, retries failed operations with linear backoff, and falls back to
//! cached or default data when offline or when the backend keeps failing.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod network;
pub mod tasks;

pub use cache::{MemoryCache, PersistentCache};
pub use config::Config;
pub use error::{CacheError, FetchError};
pub use fetch::{FetchCoordinator, FetchOptions, FetchState, RetryPolicy};
pub use network::{ConnectivityEvent, NetworkMonitor, NetworkState};
pub use tasks::{spawn_cleanup_task, spawn_connectivity_listener};
