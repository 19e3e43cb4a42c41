//! Background Tasks Module
//!
//! Long-running tasks owned by the process entry point.
//!
//! # Tasks
//! - Cache sweep: removes expired durable entries at configured intervals
//! - Connectivity listener: applies online/offline events to the monitor

mod cleanup;
mod connectivity;

pub use cleanup::spawn_cleanup_task;
pub use connectivity::spawn_connectivity_listener;
