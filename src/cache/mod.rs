//! Cache Module
//!
//! Two cache tiers with per-entry expiry: a volatile per-fetcher memory cache
//! and a durable SQLite-backed cache shared by the whole process.

mod entry;
mod memory;
mod persistent;
mod stats;


use std::time::Duration;

// Re-export public types
pub use entry::CacheEntry;
pub use memory::MemoryCache;
pub use persistent::PersistentCache;
pub use stats::CacheStats;

// == Public Constants ==
/// Default memory cache expiry
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Default durable cache TTL
pub const DEFAULT_PERSISTENT_TTL: Duration = Duration::from_secs(60 * 60);
