//! Offline Fetch - durable cache maintenance process
//!
//! Owns the lifecycle of the shared durable cache: opens it, sweeps expired
//! entries, keeps sweeping on an interval, and closes it on shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use offline_fetch::{spawn_cleanup_task, Config, PersistentCache};

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the durable cache and sweep expired entries
/// 4. Start the periodic sweep task (unless disabled)
/// 5. Wait for SIGINT/SIGTERM, then stop the task and close the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "offline_fetch=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting offline fetch cache maintenance");

    let config = Config::from_env();
    info!(
        "Configuration loaded: cache_path={}, memory_ttl={}ms, persistent_ttl={}ms, retry_count={}, cleanup_interval={}s",
        config.cache_path.display(),
        config.memory_ttl_ms,
        config.persistent_ttl_ms,
        config.retry_count,
        config.cleanup_interval
    );

    let cache = Arc::new(PersistentCache::from_config(&config));
    cache
        .open()
        .await
        .with_context(|| format!("opening cache at {}", config.cache_path.display()))?;

    let removed = cache.clean_expired().await;
    let keys = cache.keys().await;
    info!(
        "Startup sweep removed {} expired entries, {} entries remain",
        removed,
        keys.len()
    );

    let cleanup_handle = if config.cleanup_interval > 0 {
        Some(spawn_cleanup_task(cache.clone(), config.cleanup_interval))
    } else {
        info!("Periodic sweep disabled");
        None
    };

    shutdown_signal().await;

    if let Some(handle) = cleanup_handle {
        handle.abort();
        warn!("Cache sweep task aborted");
    }

    let stats = cache.stats();
    info!(
        "Cache stats: expirations={}, errors={}",
        stats.expirations, stats.errors
    );
    cache.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
