//! Fetch Module
//!
//! Fetch with cache, retry, and offline fallback.
//!
//! # Flow
//! - Offline: durable cache, then memory cache, then fallback, else an
//!   offline error. The data operation is never called.
//! - Online: a warm memory entry is returned as live data; otherwise the
//!   operation runs with retry, results are written to both tiers, and on
//!   failure the same degradation order as offline is applied.

mod coordinator;
mod options;
mod retry;
mod state;

pub use coordinator::FetchCoordinator;
pub use options::FetchOptions;
pub use retry::{retry_with_backoff, RetryPolicy};
pub use state::FetchState;
