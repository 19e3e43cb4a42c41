//! Expired Entry Sweep
//!
//! Background task that periodically removes expired durable cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::PersistentCache;

/// Spawns a background task that periodically sweeps expired entries.
///
/// Reads already evict lazily, so this only keeps the database from holding
/// entries nobody asks for again.
///
/// # Arguments
/// * `cache` - Shared durable cache handle
/// * `cleanup_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(PersistentCache::new("cache.db"));
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), 300);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<PersistentCache>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.clean_expired().await;

            if removed > 0 {
                info!("Cache sweep: removed {} expired entries", removed);
            } else {
                debug!("Cache sweep: no expired entries found");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[tokio::test]
    async fn test_cleanup_task_removes_expired_entries() {
        let clock = ManualClock::new(0);
        let cache = Arc::new(PersistentCache::in_memory().with_clock(Arc::new(clock.clone())));

        cache
            .set("expire_soon", "value", Some(Duration::from_millis(100)))
            .await;
        cache
            .set("long_lived", "value", Some(Duration::from_secs(3600)))
            .await;
        clock.set(500);

        let handle = spawn_cleanup_task(cache.clone(), 1);

        // Wait for the first sweep to run
        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(cache.keys().await, vec!["long_lived".to_string()]);

        handle.abort();
    }

    #[tokio::test]
    async fn test_cleanup_task_can_be_aborted() {
        let cache = Arc::new(PersistentCache::in_memory());

        let handle = spawn_cleanup_task(cache, 1);

        // Abort immediately
        handle.abort();

        // Wait a bit and verify task is finished
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
