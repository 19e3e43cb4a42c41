//! Connectivity signals read by the network monitor.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Environment reading of whether the host is online.
pub trait ConnectivitySignal: Send + Sync + std::fmt::Debug {
    /// `None` when the environment cannot tell.
    fn is_online(&self) -> Option<bool>;
}

/// Connectivity change reported by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    BecameOnline,
    BecameOffline,
}

/// Fixed reading, e.g. from configuration.
#[derive(Debug, Clone, Copy)]
pub struct StaticSignal(pub Option<bool>);

impl ConnectivitySignal for StaticSignal {
    fn is_online(&self) -> Option<bool> {
        self.0
    }
}

const UNKNOWN: u8 = 0;
const ONLINE: u8 = 1;
const OFFLINE: u8 = 2;

/// Reading that can be changed at runtime. Clones share the same reading.
#[derive(Debug, Clone)]
pub struct ManualSignal {
    reading: Arc<AtomicU8>,
}

impl ManualSignal {
    pub fn new(online: bool) -> Self {
        let signal = Self::unknown();
        signal.set(online);
        signal
    }

    /// A signal that cannot be read.
    pub fn unknown() -> Self {
        Self {
            reading: Arc::new(AtomicU8::new(UNKNOWN)),
        }
    }

    pub fn set(&self, online: bool) {
        let value = if online { ONLINE } else { OFFLINE };
        self.reading.store(value, Ordering::SeqCst);
    }
}

impl ConnectivitySignal for ManualSignal {
    fn is_online(&self) -> Option<bool> {
        match self.reading.load(Ordering::SeqCst) {
            ONLINE => Some(true),
            OFFLINE => Some(false),
            _ => None,
        }
    }
}
