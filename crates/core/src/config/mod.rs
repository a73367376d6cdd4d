//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (NAMESCAN_*)
//! 2. TOML config file (if NAMESCAN_CONFIG_FILE set)
//! 3. Built-in defaults
//!
//! The loaded [`AppConfig`] is built once at startup and handed to the
//! aggregator, server and client by reference.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Deserializer, Serialize};

use crate::sites::{AllowList, DEFAULT_SITES};

mod validation;

pub use validation::ConfigError;

/// How the aggregator treats a failing site during fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// Any failing site fails the whole batch; no partial results.
    #[default]
    FailFast,
    /// Each site succeeds or fails on its own; failures are reported next to
    /// the results of the sites that succeeded.
    Partial,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (NAMESCAN_*)
/// 2. TOML config file (if NAMESCAN_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the upstream search API.
    ///
    /// Set via NAMESCAN_GOOGLE_API_KEY environment variable.
    /// Required only when a search is actually issued.
    #[serde(default)]
    pub google_api_key: Option<String>,

    /// Search scope identifier (`cx`) for the upstream search API.
    ///
    /// Set via NAMESCAN_GOOGLE_CX environment variable.
    #[serde(default)]
    pub google_cx: Option<String>,

    /// Upstream search endpoint.
    ///
    /// Set via NAMESCAN_SEARCH_BASE_URL environment variable.
    #[serde(default = "default_search_base_url")]
    pub search_base_url: String,

    /// Site domains that may be queried.
    ///
    /// Set via NAMESCAN_ALLOWED_SITES environment variable (comma-separated).
    #[serde(default = "default_allowed_sites", deserialize_with = "deserialize_site_list")]
    pub allowed_sites: Vec<String>,

    /// Fan-out failure policy.
    ///
    /// Set via NAMESCAN_FANOUT_POLICY environment variable (fail_fast|partial).
    #[serde(default)]
    pub fanout_policy: FanoutPolicy,

    /// Append the optional location to each upstream query.
    ///
    /// Set via NAMESCAN_INCLUDE_LOCATION environment variable.
    #[serde(default)]
    pub include_location: bool,

    /// Address the HTTP endpoint listens on.
    ///
    /// Set via NAMESCAN_BIND_ADDR environment variable.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via NAMESCAN_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via NAMESCAN_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Path to the client-side SQLite result cache.
    ///
    /// Set via NAMESCAN_CACHE_DB_PATH environment variable.
    #[serde(default = "default_cache_db_path")]
    pub cache_db_path: PathBuf,

    /// Validity window for cached results in milliseconds; unset or 0 never expires.
    ///
    /// Set via NAMESCAN_CACHE_TTL_MS environment variable.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: Option<u64>,

    /// Maximum number of cached result sets.
    ///
    /// Set via NAMESCAN_CACHE_MAX_ENTRIES environment variable.
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: usize,
}

fn default_search_base_url() -> String {
    "https://www.googleapis.com/customsearch/v1".into()
}

fn default_allowed_sites() -> Vec<String> {
    DEFAULT_SITES.iter().map(|s| s.to_string()).collect()
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".into()
}

fn default_user_agent() -> String {
    "namescan/0.1".into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_cache_db_path() -> PathBuf {
    PathBuf::from("./namescan-cache.sqlite")
}

fn default_cache_ttl_ms() -> Option<u64> {
    Some(86_400_000) // 24h
}

fn default_cache_max_entries() -> usize {
    500
}

/// Accept either a list or a comma-separated string, falling back to the
/// built-in sites when nothing usable is left.
fn deserialize_site_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SiteList {
        Joined(String),
        List(Vec<String>),
    }

    let raw = match SiteList::deserialize(deserializer)? {
        SiteList::Joined(s) => crate::sites::parse_site_list(&s),
        SiteList::List(v) => v.into_iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
    };

    Ok(if raw.is_empty() { default_allowed_sites() } else { raw })
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            google_api_key: None,
            google_cx: None,
            search_base_url: default_search_base_url(),
            allowed_sites: default_allowed_sites(),
            fanout_policy: FanoutPolicy::default(),
            include_location: false,
            bind_addr: default_bind_addr(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            cache_db_path: default_cache_db_path(),
            cache_ttl_ms: default_cache_ttl_ms(),
            cache_max_entries: default_cache_max_entries(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Cache validity window, `None` when entries never expire.
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_ms.filter(|ms| *ms > 0).map(Duration::from_millis)
    }

    /// The configured allow-list.
    ///
    /// Entries that are not valid domains are skipped; `validate` reports them.
    pub fn allow_list(&self) -> AllowList {
        AllowList::new(self.allowed_sites.as_slice())
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `NAMESCAN_`
    /// 2. TOML file from `NAMESCAN_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("NAMESCAN_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        Self::extract(figment.merge(Env::prefixed("NAMESCAN_").map(|key| key.as_str().to_lowercase().into())))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Upstream credentials, checked when a search is issued rather than at startup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the API key or the scope id is not set.
    pub fn require_google_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let key = self.google_api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "google_api_key".into(),
            hint: "Set NAMESCAN_GOOGLE_API_KEY environment variable".into(),
        })?;
        let cx = self.google_cx.as_deref().filter(|c| !c.is_empty()).ok_or_else(|| ConfigError::Missing {
            field: "google_cx".into(),
            hint: "Set NAMESCAN_GOOGLE_CX environment variable".into(),
        })?;
        Ok((key, cx))
    }
}
