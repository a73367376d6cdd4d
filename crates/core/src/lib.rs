//! Core types and shared functionality for namescan.
//!
//! This crate provides:
//! - Site domains and the allow-list
//! - Result records and per-site counts
//! - Result cache with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures
//! - User-facing message catalog

pub mod cache;
pub mod config;
pub mod error;
pub mod i18n;
pub mod sites;
pub mod types;

pub use cache::{CacheDb, CacheEntry, CacheKey, CachePolicy, MemoryCache, ResultCache};
pub use config::{AppConfig, ConfigError, FanoutPolicy};
pub use error::{Error, ErrorBody, ErrorKind};
pub use i18n::{Locale, Messages};
pub use sites::{AllowList, DEFAULT_SITES, SiteDomain, parse_site_list};
pub use types::{ResultItem, SearchReport, SiteFailure, site_counts, summarize_counts};
