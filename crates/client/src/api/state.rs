//! Observable state of a [`SearchClient`](super::SearchClient).

use namescan_core::{Error, ErrorKind, ResultItem};
use serde::Serialize;

/// Where the latest search invocation stands.
///
/// `Success`, `RateLimited`, `Failed` and `Aborted` are terminal for one
/// invocation; the next one starts over from `Loading`, or jumps straight to
/// `Success` on a cache hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    #[default]
    Idle,
    Loading,
    Success,
    RateLimited,
    Failed,
    Aborted,
}

impl SearchPhase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, SearchPhase::Idle | SearchPhase::Loading)
    }
}

/// A user-facing failure: a stable code plus a localized message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl SearchFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

impl From<&Error> for SearchFailure {
    fn from(err: &Error) -> Self {
        Self::new(err.kind(), err.message())
    }
}

/// Snapshot published to subscribers after every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub phase: SearchPhase,
    pub results: Vec<ResultItem>,
    pub error: Option<SearchFailure>,
    pub loading: bool,
}

impl SearchState {
    pub fn loading() -> Self {
        Self { phase: SearchPhase::Loading, loading: true, ..Default::default() }
    }

    pub fn success(results: Vec<ResultItem>) -> Self {
        Self { phase: SearchPhase::Success, results, ..Default::default() }
    }

    /// Terminal failure; a rate limit gets its own phase.
    pub fn failed(failure: SearchFailure) -> Self {
        let phase = match failure.kind {
            ErrorKind::RateLimited => SearchPhase::RateLimited,
            _ => SearchPhase::Failed,
        };
        Self { phase, error: Some(failure), ..Default::default() }
    }
}
