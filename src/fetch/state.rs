//! Observable result of a fetcher.

use serde::Serialize;

use crate::error::FetchError;

// == Fetch State ==
/// Everything a UI binding needs to render one fetcher, published as a
/// single value so loading, data, and error always change together.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchState<T> {
    /// Nothing requested yet, or reset
    Idle,
    /// Online fetch in progress
    Loading,
    /// Data available; `from_cache` is set when it did not come from a live call
    Success { data: T, from_cache: bool },
    /// The fetch failed; `fallback` holds degraded data when some was found
    Failure {
        #[serde(serialize_with = "error_message")]
        error: FetchError,
        fallback: Option<T>,
    },
}

fn error_message<S: serde::Serializer>(error: &FetchError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Idle
    }
}

impl<T> FetchState<T> {
    /// Data to display, including degraded data shown next to an error.
    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Success { data, .. } => Some(data),
            FetchState::Failure { fallback, .. } => fallback.as_ref(),
            FetchState::Idle | FetchState::Loading => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            FetchState::Success { data, .. } => Some(data),
            FetchState::Failure { fallback, .. } => fallback,
            FetchState::Idle | FetchState::Loading => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failure { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Whether the displayed data came from a cache tier or the fallback.
    pub fn is_from_cache(&self) -> bool {
        match self {
            FetchState::Success { from_cache, .. } => *from_cache,
            FetchState::Failure { fallback, .. } => fallback.is_some(),
            FetchState::Idle | FetchState::Loading => false,
        }
    }
}
