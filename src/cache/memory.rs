//! Memory Cache Module
//!
//! Volatile per-fetcher storage with lazy expiry.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, DEFAULT_MEMORY_TTL};
use crate::clock::{system_clock, SharedClock};

#[derive(Debug)]
struct Inner<T> {
    entries: HashMap<String, CacheEntry<T>>,
    stats: CacheStats,
}

// == Memory Cache ==
/// In-memory cache bound to one key.
///
/// Each fetcher owns its own instance, so two fetchers using the same key do
/// not see each other's values here; only the persistent tier is shared.
#[derive(Debug)]
pub struct MemoryCache<T> {
    /// Key this cache reads and writes
    key: String,
    /// Lifetime given to each stored entry
    expiry: Duration,
    clock: SharedClock,
    inner: Mutex<Inner<T>>,
}

impl<T: Clone> MemoryCache<T> {
    // == Constructor ==
    /// Creates a cache for `key` with the default five minute expiry.
    pub fn new(key: impl Into<String>) -> Self {
        Self::with_expiry(key, DEFAULT_MEMORY_TTL)
    }

    /// Creates a cache for `key` whose entries live for `expiry`.
    pub fn with_expiry(key: impl Into<String>, expiry: Duration) -> Self {
        Self {
            key: key.into(),
            expiry,
            clock: system_clock(),
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                stats: CacheStats::new(),
            }),
        }
    }

    /// Replaces the time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Set ==
    /// Stores `data`, overwriting any previous entry and resetting its expiry.
    pub fn set(&self, data: T) {
        let entry = CacheEntry::new(self.key.clone(), data, self.clock.now_ms(), self.expiry);
        self.lock().entries.insert(self.key.clone(), entry);
    }

    // == Get ==
    /// Returns the stored data while it has not expired.
    ///
    /// An expired entry is removed and reported as a miss.
    pub fn get(&self) -> Option<T> {
        let now = self.clock.now_ms();
        let mut guard = self.lock();
        let inner = &mut *guard;

        match inner.entries.get(&self.key) {
            Some(entry) if entry.is_expired(now) => {
                inner.entries.remove(&self.key);
                inner.stats.record_expirations(1);
                inner.stats.record_miss();
                None
            }
            Some(entry) => {
                let data = entry.data.clone();
                inner.stats.record_hit();
                Some(data)
            }
            None => {
                inner.stats.record_miss();
                None
            }
        }
    }

    // == Invalidate ==
    /// Removes this key's entry.
    pub fn invalidate(&self) {
        self.lock().entries.remove(&self.key);
    }

    // == Clear ==
    /// Removes every entry held by this cache.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Whether an entry is physically stored, ignoring expiry.
    pub fn contains_entry(&self) -> bool {
        self.lock().entries.contains_key(&self.key)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.lock().stats.clone()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn cache_at(clock: &ManualClock, expiry_ms: u64) -> MemoryCache<String> {
        MemoryCache::with_expiry("posts-1-all", Duration::from_millis(expiry_ms))
            .with_clock(Arc::new(clock.clone()))
    }

    #[test]
    fn test_default_expiry_is_five_minutes() {
        let cache: MemoryCache<u32> = MemoryCache::new("k");
        assert_eq!(cache.expiry(), Duration::from_secs(300));
        assert_eq!(cache.key(), "k");
    }

    #[test]
    fn test_set_and_get() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        cache.set("hello".to_string());
        assert_eq!(cache.get(), Some("hello".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_empty() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        assert_eq!(cache.get(), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        cache.set("v1".to_string());
        clock.advance(Duration::from_millis(800));
        cache.set("v2".to_string());
        clock.advance(Duration::from_millis(800));

        assert_eq!(cache.get(), Some("v2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_get_removes_entry() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        cache.set("x".to_string());
        clock.set(1500);

        assert_eq!(cache.get(), None);
        assert!(!cache.contains_entry());
        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_invalidate() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        cache.set("x".to_string());
        cache.invalidate();

        assert!(cache.is_empty());
        assert_eq!(cache.get(), None);
    }

    #[test]
    fn test_clear() {
        let clock = ManualClock::new(0);
        let cache = cache_at(&clock, 1000);

        cache.set("x".to_string());
        cache.clear();

        assert!(cache.is_empty());
    }
}
