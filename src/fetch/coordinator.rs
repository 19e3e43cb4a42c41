//! Fetch Coordinator Module
//!
//! Produces the best available value for one fetcher, balancing freshness,
//! latency, and resilience to network and backend failures.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::options::FetchOptions;
use super::retry::retry_with_backoff;
use super::state::FetchState;
use crate::cache::{MemoryCache, PersistentCache};
use crate::clock::SharedClock;
use crate::error::FetchError;
use crate::network::NetworkMonitor;

// == Fetch Coordinator ==
/// Runs a data operation through the memory cache, the shared durable
/// cache, bounded retry, and offline fallback.
///
/// Each call to [`execute`](Self::execute) is independent. Overlapping calls
/// for the same key are not coalesced; the last one to finish wins both the
/// caches and the published state.
#[derive(Debug)]
pub struct FetchCoordinator<T> {
    options: FetchOptions<T>,
    /// Present only when a cache key is configured
    memory: Option<MemoryCache<T>>,
    persistent: Arc<PersistentCache>,
    network: Arc<NetworkMonitor>,
    state: watch::Sender<FetchState<T>>,
}

impl<T> FetchCoordinator<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    // == Constructor ==
    pub fn new(
        options: FetchOptions<T>,
        network: Arc<NetworkMonitor>,
        persistent: Arc<PersistentCache>,
    ) -> Self {
        let memory = options
            .cache_key
            .as_ref()
            .map(|key| MemoryCache::with_expiry(key.clone(), options.memory_expiry()));
        let (state, _) = watch::channel(FetchState::Idle);
        Self {
            options,
            memory,
            persistent,
            network,
            state,
        }
    }

    /// Replaces the memory cache's time source.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.memory = self.memory.map(|memory| memory.with_clock(clock));
        self
    }

    pub fn cache_key(&self) -> Option<&str> {
        self.options.cache_key.as_deref()
    }

    pub fn options(&self) -> &FetchOptions<T> {
        &self.options
    }

    /// This fetcher's private memory cache, when caching is enabled.
    pub fn memory_cache(&self) -> Option<&MemoryCache<T>> {
        self.memory.as_ref()
    }

    // == Observable State ==
    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    pub fn data(&self) -> Option<T> {
        self.state.borrow().data().cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    pub fn error(&self) -> Option<FetchError> {
        self.state.borrow().error().cloned()
    }

    pub fn is_from_cache(&self) -> bool {
        self.state.borrow().is_from_cache()
    }

    fn publish(&self, state: FetchState<T>) {
        self.state.send_replace(state);
    }

    fn label(&self) -> &str {
        self.cache_key().unwrap_or("<uncached>")
    }

    // == Execute ==
    /// Fetches data for this fetcher and returns it, or `None` when nothing
    /// could be produced. The outcome is also published as [`FetchState`].
    ///
    /// `op` is invoked once per attempt; arguments are captured by the closure.
    pub async fn execute<F, Fut, E>(&self, op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if self.network.is_online() {
            self.execute_online(op).await
        } else {
            self.execute_offline().await
        }
    }

    async fn execute_offline(&self) -> Option<T> {
        if let Some(data) = self.cached().await {
            info!("[offline] Serving cached data [{}]", self.label());
            return Some(self.succeed(data, true));
        }

        if let Some(fallback) = self.options.fallback.clone() {
            info!("[offline] Serving fallback data [{}]", self.label());
            return Some(self.succeed(fallback, true));
        }

        warn!("[offline] No data available [{}]", self.label());
        self.publish(FetchState::Failure {
            error: FetchError::OfflineNoData,
            fallback: None,
        });
        None
    }

    async fn execute_online<F, Fut, E>(&self, op: F) -> Option<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        self.publish(FetchState::Loading);

        // A warm memory entry counts as live data until it expires.
        if let Some(data) = self.memory.as_ref().and_then(MemoryCache::get) {
            debug!("Memory cache hit [{}]", self.label());
            return Some(self.succeed(data, false));
        }

        match retry_with_backoff(&self.options.retry, op).await {
            Ok(data) => {
                if let Some(memory) = &self.memory {
                    memory.set(data.clone());
                    self.persistent
                        .set(memory.key(), &data, self.options.expiry)
                        .await;
                }
                Some(self.succeed(data, false))
            }
            Err(e) => {
                let error = FetchError::operation(&e);
                error!("[fetch failed] {}: {}", self.label(), error);

                let recovered = match self.cached().await {
                    Some(data) => Some(data),
                    None => self.options.fallback.clone(),
                };
                if recovered.is_some() {
                    info!("[fetch failed] Serving degraded data [{}]", self.label());
                }
                self.publish(FetchState::Failure {
                    error,
                    fallback: recovered.clone(),
                });
                recovered
            }
        }
    }

    /// Durable tier first, then memory. Both are skipped without a key.
    async fn cached(&self) -> Option<T> {
        let memory = self.memory.as_ref()?;
        if let Some(data) = self.persistent.get::<T>(memory.key()).await {
            debug!("Persistent cache hit [{}]", memory.key());
            return Some(data);
        }
        let data = memory.get()?;
        debug!("Memory cache hit [{}]", memory.key());
        Some(data)
    }

    fn succeed(&self, data: T, from_cache: bool) -> T {
        self.publish(FetchState::Success {
            data: data.clone(),
            from_cache,
        });
        data
    }

    // == Reset ==
    /// Returns to `Idle` and drops this key from both cache tiers.
    pub async fn reset(&self) {
        self.publish(FetchState::Idle);
        if let Some(memory) = &self.memory {
            memory.invalidate();
            self.persistent.delete(memory.key()).await;
            debug!("Fetcher reset [{}]", memory.key());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::StaticSignal;
    use std::time::Duration;

    fn coordinator(
        online: bool,
        options: FetchOptions<String>,
    ) -> (FetchCoordinator<String>, Arc<PersistentCache>) {
        let network = Arc::new(NetworkMonitor::new(Arc::new(StaticSignal(Some(online)))));
        let persistent = Arc::new(PersistentCache::in_memory());
        (
            FetchCoordinator::new(options, network, persistent.clone()),
            persistent,
        )
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let (fetcher, _) = coordinator(true, FetchOptions::new());
        assert_eq!(fetcher.state(), FetchState::Idle);
        assert!(fetcher.memory_cache().is_none());
    }

    #[tokio::test]
    async fn test_success_fills_both_tiers() {
        let (fetcher, persistent) = coordinator(true, FetchOptions::new().with_cache_key("profile"));

        let result = fetcher
            .execute(|| async { Ok::<_, String>("me".to_string()) })
            .await;

        assert_eq!(result.as_deref(), Some("me"));
        assert_eq!(
            fetcher.state(),
            FetchState::Success {
                data: "me".to_string(),
                from_cache: false
            }
        );
        assert_eq!(fetcher.memory_cache().unwrap().get().as_deref(), Some("me"));
        assert_eq!(persistent.get::<String>("profile").await.as_deref(), Some("me"));
    }

    #[tokio::test]
    async fn test_without_key_nothing_is_cached() {
        let (fetcher, persistent) = coordinator(true, FetchOptions::new());

        fetcher
            .execute(|| async { Ok::<_, String>("fresh".to_string()) })
            .await;

        assert!(fetcher.cache_key().is_none());
        assert!(persistent.keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_persists_with_configured_expiry() {
        let (fetcher, persistent) = coordinator(
            true,
            FetchOptions::new()
                .with_cache_key("tags")
                .with_expiry(Duration::from_millis(1)),
        );

        fetcher
            .execute(|| async { Ok::<_, String>("rust".to_string()) })
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(persistent.get::<String>("tags").await, None);
    }

    #[tokio::test]
    async fn test_reset_clears_state_and_caches() {
        let (fetcher, persistent) = coordinator(true, FetchOptions::new().with_cache_key("blog-1-all"));
        fetcher
            .execute(|| async { Ok::<_, String>("posts".to_string()) })
            .await;

        fetcher.reset().await;

        assert_eq!(fetcher.state(), FetchState::Idle);
        assert!(!fetcher.memory_cache().unwrap().contains_entry());
        assert_eq!(persistent.get::<String>("blog-1-all").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscriber_sees_loading_then_success() {
        let (fetcher, _) = coordinator(true, FetchOptions::new().with_cache_key("qa"));
        let mut rx = fetcher.subscribe();

        let run = fetcher.execute(|| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, String>("answers".to_string())
        });
        let watch = async {
            rx.changed().await.unwrap();
            let first = rx.borrow_and_update().clone();
            rx.changed().await.unwrap();
            let second = rx.borrow_and_update().clone();
            (first, second)
        };

        let (_, (first, second)) = tokio::join!(run, watch);
        assert!(first.is_loading());
        assert_eq!(second.data().map(String::as_str), Some("answers"));
    }
}
