//! Network Monitor Module
//!
//! Process-wide view of connectivity, updated from environment events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use super::signal::{ConnectivityEvent, ConnectivitySignal};

// == Network State ==
/// Last observed connectivity and when each direction last happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkState {
    pub is_online: bool,
    pub last_online_at: DateTime<Utc>,
    /// `None` until the first offline transition
    pub last_offline_at: Option<DateTime<Utc>>,
}

// == Network Monitor ==
/// Tracks online/offline transitions. Never fails: an unreadable signal
/// counts as online.
#[derive(Debug)]
pub struct NetworkMonitor {
    signal: Arc<dyn ConnectivitySignal>,
    state: watch::Sender<NetworkState>,
}

impl NetworkMonitor {
    /// Creates a monitor seeded from the current signal reading.
    pub fn new(signal: Arc<dyn ConnectivitySignal>) -> Self {
        let is_online = signal.is_online().unwrap_or(true);
        let (state, _) = watch::channel(NetworkState {
            is_online,
            last_online_at: Utc::now(),
            last_offline_at: None,
        });
        debug!("Network monitor started (online: {})", is_online);
        Self { signal, state }
    }

    pub fn is_online(&self) -> bool {
        self.state.borrow().is_online
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> NetworkState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every transition.
    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.state.subscribe()
    }

    /// Applies an environment transition event.
    pub fn handle_event(&self, event: ConnectivityEvent) {
        let now = Utc::now();
        self.state.send_modify(|state| match event {
            ConnectivityEvent::BecameOnline => {
                state.is_online = true;
                state.last_online_at = now;
            }
            ConnectivityEvent::BecameOffline => {
                state.is_online = false;
                state.last_offline_at = Some(now);
            }
        });
        match event {
            ConnectivityEvent::BecameOnline => info!("Network connected"),
            ConnectivityEvent::BecameOffline => info!("Network disconnected"),
        }
    }

    // == Retry Connection ==
    /// Re-samples the signal and returns the resulting online flag.
    ///
    /// Still offline leaves the state untouched.
    pub fn retry_connection(&self) -> bool {
        let online = self.signal.is_online().unwrap_or(true);
        if !online {
            debug!("Network still unavailable, retry skipped");
            return self.is_online();
        }
        if !self.is_online() {
            self.handle_event(ConnectivityEvent::BecameOnline);
        }
        true
    }
}
