//! Connectivity Listener
//!
//! Forwards environment connectivity events to the network monitor.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::network::{ConnectivityEvent, NetworkMonitor};

/// Spawns a task applying every event received on `events` to `monitor`.
///
/// The task ends when all senders are dropped.
pub fn spawn_connectivity_listener(
    monitor: Arc<NetworkMonitor>,
    mut events: mpsc::Receiver<ConnectivityEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            monitor.handle_event(event);
        }
        debug!("Connectivity event source closed");
    })
}
