//! Custom Search JSON API client.
//!
//! Issues one `site:`-scoped query per call and normalizes the hits into
//! [`ResultItem`]s tagged with that site.
//!
//! ### Upstream contract
//!
//! - **Endpoint**: `GET <base>?key=<API_KEY>&cx=<SCOPE_ID>&q=<site:domain name>`
//! - **Response**: `{ items?: [{ title, link, snippet, ... }] }`; a missing
//!   `items` list means no matches.
//! - **Errors**: 401/403 and `keyInvalid` map to [`UpstreamError::AuthError`],
//!   429 to [`UpstreamError::RateLimited`], other non-2xx statuses to
//!   [`UpstreamError::HttpError`].
//!
//! There is no client-side throttling: per-site calls run concurrently and
//! an upstream 429 is passed through to the caller.

pub mod error;
pub mod request;
pub mod response;

pub use error::UpstreamError;
pub use request::SiteQuery;
pub use response::CustomSearchResponse;

use async_trait::async_trait;
use namescan_core::{AppConfig, ResultItem};
use reqwest::header;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregate::SiteSearcher;
use request::CustomSearchParams;

/// Default upstream endpoint.
const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/customsearch/v1";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default user agent.
const DEFAULT_USER_AGENT: &str = "namescan/0.1";

/// Upstream client configuration.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    /// API key.
    pub api_key: String,
    /// Search scope identifier (`cx`).
    pub cx: String,
    /// Endpoint URL (default: https://www.googleapis.com/customsearch/v1).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// User-agent string (default: namescan/0.x).
    pub user_agent: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            cx: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GoogleConfig {
    /// Build from the application configuration.
    ///
    /// Credentials come from server-side configuration only, never from the
    /// request being served.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        let (api_key, cx) =
            config.require_google_credentials().map_err(|e| UpstreamError::MissingCredentials(e.to_string()))?;

        Ok(Self {
            api_key: api_key.to_string(),
            cx: cx.to_string(),
            base_url: config.search_base_url.clone(),
            timeout: config.timeout(),
            user_agent: config.user_agent.clone(),
        })
    }
}

/// Upstream search client.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    config: Arc<GoogleConfig>,
}

impl GoogleClient {
    /// Create a new client with the given configuration.
    pub fn new(config: GoogleConfig) -> Result<Self, UpstreamError> {
        if config.api_key.is_empty() {
            return Err(UpstreamError::MissingCredentials("api key is empty".to_string()));
        }
        if config.cx.is_empty() {
            return Err(UpstreamError::MissingCredentials("search scope id is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| UpstreamError::Network(Arc::new(e)))?;

        Ok(Self { http, config: Arc::new(config) })
    }

    /// Create a new client from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, UpstreamError> {
        Self::new(GoogleConfig::from_app_config(config)?)
    }

    /// Execute one site-scoped query.
    pub async fn search(&self, query: &SiteQuery) -> Result<Vec<ResultItem>, UpstreamError> {
        query.validate()?;

        let start = Instant::now();
        let params = CustomSearchParams { key: &self.config.api_key, cx: &self.config.cx, q: query.q() };

        tracing::debug!(site = %query.site, "querying upstream search API");

        let http_response = self
            .http
            .get(&self.config.base_url)
            .header(header::ACCEPT, "application/json")
            .query(&params)
            .send()
            .await?;

        let status = http_response.status();
        let bytes = http_response.bytes().await?;

        tracing::debug!(site = %query.site, status = status.as_u16(), "upstream response");

        if status == 401 || status == 403 {
            return Err(UpstreamError::AuthError);
        }

        if status == 429 {
            return Err(UpstreamError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            let body = response::parse_error(&bytes);
            if body.as_ref().is_some_and(|b| b.is_key_invalid()) {
                return Err(UpstreamError::AuthError);
            }
            return Err(UpstreamError::HttpError { status: status.as_u16(), message: body.and_then(|b| b.message) });
        }

        let api_response: CustomSearchResponse =
            serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Parse(e.to_string()))?;
        let results = api_response.into_results(&query.site);

        tracing::debug!(
            site = %query.site,
            count = results.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "site search completed"
        );

        Ok(results)
    }
}

#[async_trait]
impl SiteSearcher for GoogleClient {
    async fn search_site(&self, query: &SiteQuery) -> Result<Vec<ResultItem>, UpstreamError> {
        self.search(query).await
    }
}
