//! Error types for the fetch layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Fetch Error Enum ==
/// Errors surfaced to callers through the fetch state.
///
/// These are never returned as `Err` from `execute`; they end up inside
/// `FetchState::Failure` so the UI can render them next to any stale data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Offline with no cached or fallback data available
    #[error("Currently offline, please check your network connection")]
    OfflineNoData,

    /// The data operation failed on every attempt; carries the last failure
    #[error("{0}")]
    Operation(String),
}

impl FetchError {
    /// Wraps the message of the last underlying failure.
    pub fn operation(err: impl std::fmt::Display) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            FetchError::Operation("Unknown error".to_string())
        } else {
            FetchError::Operation(message)
        }
    }
}

// == Cache Error Enum ==
/// Durable storage errors. Never propagated past `PersistentCache`.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Storage engine could not be opened
    #[error("Cache storage unavailable: {0}")]
    Unavailable(String),

    /// Store was closed by the process entry point
    #[error("Cache storage closed")]
    Closed,

    /// SQLite failure
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Entry could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the store location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

// == Result Type Alias ==
/// Convenience Result type for the storage layer.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_message_mentions_connection() {
        let msg = FetchError::OfflineNoData.to_string();
        assert!(msg.contains("offline"));
        assert!(msg.contains("connection"));
    }

    #[test]
    fn test_operation_wraps_message() {
        let err = FetchError::operation("backend returned 503");
        assert_eq!(err, FetchError::Operation("backend returned 503".to_string()));
        assert_eq!(err.to_string(), "backend returned 503");
    }

    #[test]
    fn test_operation_empty_message_falls_back() {
        let err = FetchError::operation("");
        assert_eq!(err.to_string(), "Unknown error");
    }

    #[test]
    fn test_cache_error_from_serde() {
        let parse_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: CacheError = parse_err.into();
        assert!(matches!(err, CacheError::Serialization(_)));
    }
}
