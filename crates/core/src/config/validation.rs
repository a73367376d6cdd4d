//! Checks applied to `AppConfig` once all layers are merged.

use std::net::SocketAddr;
use std::ops::RangeInclusive;

use crate::config::AppConfig;
use crate::sites::SiteDomain;
use thiserror::Error;

/// Accepted upstream timeout, in milliseconds.
const TIMEOUT_RANGE_MS: RangeInclusive<u64> = 100..=300_000;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Reject values the server or client cannot run with.
    ///
    /// Credentials are not checked here; see `require_google_credentials`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !TIMEOUT_RANGE_MS.contains(&self.timeout_ms) {
            return Err(invalid(
                "timeout_ms",
                format!("must be between {} and {} ms", TIMEOUT_RANGE_MS.start(), TIMEOUT_RANGE_MS.end()),
            ));
        }

        if self.user_agent.trim().is_empty() {
            return Err(invalid("user_agent", "must not be empty"));
        }

        let base = url::Url::parse(&self.search_base_url).map_err(|e| invalid("search_base_url", e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("search_base_url", format!("unsupported scheme: {}", base.scheme())));
        }

        if let Some(bad) = self.allowed_sites.iter().find(|s| SiteDomain::parse(s).is_none()) {
            return Err(invalid("allowed_sites", format!("not a domain: {bad:?}")));
        }

        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid("bind_addr", format!("not a socket address: {}", self.bind_addr)));
        }

        if self.cache_max_entries == 0 {
            return Err(invalid("cache_max_entries", "must be greater than 0"));
        }

        if self.cache_ttl().is_none() {
            tracing::warn!("cache_ttl_ms is unset or 0; cached results never expire");
        }

        Ok(())
    }
}
