//! Client code for namescan.
//!
//! This crate provides the upstream search API client, the fan-out
//! aggregator built on it, and the cached client for the HTTP endpoint
//! used by the CLI.

pub mod aggregate;
pub mod api;
pub mod google;

pub use aggregate::{SearchAggregator, SiteSearcher};
pub use api::{DEFAULT_DEBOUNCE, Debouncer, SearchClient, SearchFailure, SearchPhase, SearchState};
pub use google::{GoogleClient, GoogleConfig, SiteQuery, UpstreamError};
