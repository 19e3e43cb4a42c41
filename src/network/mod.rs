//! Network Module
//!
//! Connectivity tracking used to choose between the online and offline
//! fetch paths.

mod monitor;
mod signal;

pub use monitor::{NetworkMonitor, NetworkState};
pub use signal::{ConnectivityEvent, ConnectivitySignal, ManualSignal, StaticSignal};
