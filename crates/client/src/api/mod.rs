//! Cached client for the `/api/search` endpoint.
//!
//! [`SearchClient`] answers identical queries from a [`ResultCache`], calls the
//! endpoint on a miss, and publishes every transition as a [`SearchState`]
//! through a `watch` channel. A newer invocation, or [`SearchClient::cancel`],
//! cancels the one in flight; a superseded invocation never writes state.

pub mod debounce;
pub mod state;

pub use debounce::{DEFAULT_DEBOUNCE, Debouncer};
pub use state::{SearchFailure, SearchPhase, SearchState};

use chrono::Utc;
use namescan_core::{
    CacheEntry, CacheKey, CachePolicy, Error, ErrorBody, ErrorKind, Locale, Messages, ResultCache, ResultItem,
    SearchReport, SiteDomain,
};
use reqwest::StatusCode;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Default timeout for calls to the endpoint.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bookkeeping for the invocation that currently owns the state.
#[derive(Debug, Default)]
struct Inflight {
    generation: u64,
    token: CancellationToken,
}

/// Cache-first client for the search endpoint.
#[derive(Clone)]
pub struct SearchClient {
    http: reqwest::Client,
    endpoint: Url,
    cache: Arc<dyn ResultCache>,
    policy: CachePolicy,
    locale: Locale,
    state: Arc<watch::Sender<SearchState>>,
    inflight: Arc<Mutex<Inflight>>,
}

impl SearchClient {
    /// Create a client for the server at `endpoint` (e.g. `http://127.0.0.1:8787`).
    pub fn new(endpoint: &str, cache: Arc<dyn ResultCache>, policy: CachePolicy) -> Result<Self, Error> {
        let mut endpoint =
            Url::parse(endpoint).map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(concat!("namescan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint,
            cache,
            policy,
            locale: Locale::default(),
            state: Arc::new(watch::Sender::new(SearchState::default())),
            inflight: Arc::new(Mutex::new(Inflight::default())),
        })
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn messages(&self) -> &'static Messages {
        self.locale.messages()
    }

    /// Receive every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    /// Search `name` on `sites`, publishing state along the way.
    ///
    /// Returns the terminal phase of this invocation. `Aborted` means it was
    /// cancelled or superseded and left the published state untouched.
    pub async fn search<S: AsRef<str>>(&self, name: &str, sites: &[S], location: Option<&str>) -> SearchPhase {
        let (generation, token) = self.begin();
        let messages = self.messages();

        let name = name.trim();
        if name.is_empty() {
            let failure = SearchFailure::new(ErrorKind::InvalidInput, messages.enter_name);
            return self.finish(generation, SearchState::failed(failure));
        }

        let mut domains: Vec<SiteDomain> = Vec::new();
        for site in sites.iter().filter_map(|s| SiteDomain::parse(s.as_ref())) {
            if !domains.contains(&site) {
                domains.push(site);
            }
        }
        if domains.is_empty() {
            let failure = SearchFailure::new(ErrorKind::NoSites, messages.select_site);
            return self.finish(generation, SearchState::failed(failure));
        }

        let location = location.map(str::trim).filter(|l| !l.is_empty());
        let key = CacheKey::new(name, location, &domains);

        if let Some(results) = self.cached(&key).await {
            tracing::debug!(key = %key.hash(), count = results.len(), "cache hit");
            return self.finish(generation, SearchState::success(results));
        }

        if !self.commit(generation, SearchState::loading()) {
            return SearchPhase::Aborted;
        }

        let outcome = tokio::select! {
            _ = token.cancelled() => None,
            outcome = self.fetch(name, &domains, location) => Some(outcome),
        };

        let state = match outcome {
            None => {
                tracing::debug!(generation, "search cancelled");
                return SearchPhase::Aborted;
            }
            Some(Ok(results)) => {
                if let Err(e) = self.cache.put(&key, &CacheEntry::now(results.clone())).await {
                    tracing::warn!(error = %e, "failed to write cache entry");
                }
                SearchState::success(results)
            }
            Some(Err(failure)) => {
                tracing::debug!(kind = %failure.kind, "search failed");
                SearchState::failed(failure)
            }
        };

        self.finish(generation, state)
    }

    /// Fetch the per-site report without touching the cache or the published state.
    ///
    /// [`SearchClient::cancel`] or a newer [`SearchClient::search`] stops it
    /// with a `CANCELLED` failure.
    pub async fn search_report<S: AsRef<str>>(
        &self, name: &str, sites: &[S], location: Option<&str>,
    ) -> Result<SearchReport, SearchFailure> {
        let token = self.inflight.lock().unwrap_or_else(PoisonError::into_inner).token.clone();
        let params = search_params(name, sites.iter().map(|s| s.as_ref()), location);

        tokio::select! {
            _ = token.cancelled() => Err(SearchFailure::from(&Error::Cancelled)),
            report = self.fetch_report(&params) => report,
        }
    }

    /// Ask the server which sites it allows.
    pub async fn allowed_sites(&self) -> Result<Vec<SiteDomain>, SearchFailure> {
        let response = self.get("api/sites", &[]).await?;
        self.decode(response).await
    }

    /// Abort the in-flight invocation, if any.
    pub fn cancel(&self) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.generation += 1;
        inflight.token.cancel();
        inflight.token = CancellationToken::new();
        self.state.send_if_modified(|state| {
            if !state.loading {
                return false;
            }
            state.phase = SearchPhase::Aborted;
            state.loading = false;
            true
        });
    }

    /// Drop cache entries that can no longer satisfy a request.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        match self.policy.cutoff(Utc::now()) {
            Some(cutoff) => self.cache.purge_older_than(cutoff).await,
            None => Ok(0),
        }
    }

    /// Start a new invocation, cancelling the previous one.
    fn begin(&self) -> (u64, CancellationToken) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        inflight.token.cancel();
        inflight.generation += 1;
        inflight.token = CancellationToken::new();
        (inflight.generation, inflight.token.clone())
    }

    /// Publish `state` if `generation` still owns it.
    fn commit(&self, generation: u64, state: SearchState) -> bool {
        let inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        if inflight.generation != generation {
            return false;
        }
        self.state.send_replace(state);
        true
    }

    fn finish(&self, generation: u64, state: SearchState) -> SearchPhase {
        let phase = state.phase;
        if self.commit(generation, state) { phase } else { SearchPhase::Aborted }
    }

    async fn cached(&self, key: &CacheKey) -> Option<Vec<ResultItem>> {
        match self.cache.get(key).await {
            Ok(Some(entry)) if self.policy.is_fresh(&entry, Utc::now()) => Some(entry.results),
            Ok(Some(_)) => {
                tracing::debug!(key = %key.hash(), "cache entry expired");
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn fetch(
        &self, name: &str, sites: &[SiteDomain], location: Option<&str>,
    ) -> Result<Vec<ResultItem>, SearchFailure> {
        let params = search_params(name, sites.iter().map(SiteDomain::as_str), location);
        let response = self.get("api/search", &params).await?;
        self.decode(response).await
    }

    async fn fetch_report(&self, params: &[(&str, String)]) -> Result<SearchReport, SearchFailure> {
        let response = self.get("api/search/report", params).await?;
        self.decode(response).await
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response, SearchFailure> {
        let messages = self.messages();
        let url = self
            .endpoint
            .join(path)
            .map_err(|e| SearchFailure::new(ErrorKind::ConfigError, format!("{}: {e}", messages.generic_error)))?;

        let response = self.http.get(url).query(params).send().await.map_err(|e| {
            tracing::warn!(error = %e, "search endpoint unreachable");
            let kind = if e.is_timeout() { ErrorKind::Timeout } else { ErrorKind::NetworkError };
            SearchFailure::new(kind, messages.connectivity_error)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchFailure::new(ErrorKind::RateLimited, messages.rate_limited));
        }

        let body: Option<ErrorBody> = response.json().await.ok();
        Err(classify(status, body, messages))
    }

    async fn decode<T: serde::de::DeserializeOwned>(&self, response: reqwest::Response) -> Result<T, SearchFailure> {
        response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "malformed response from search endpoint");
            SearchFailure::new(ErrorKind::ParseError, self.messages().generic_error)
        })
    }
}

/// Turn a non-2xx response into a user-facing failure using the server's `code`.
fn classify(status: StatusCode, body: Option<ErrorBody>, messages: &Messages) -> SearchFailure {
    let (message, code) = match body {
        Some(ErrorBody { error, code }) => (Some(error).filter(|m| !m.is_empty()), code),
        None => (None, None),
    };

    match code {
        Some(ErrorKind::RateLimited) => SearchFailure::new(ErrorKind::RateLimited, messages.rate_limited),
        Some(ErrorKind::UpstreamAuth) => SearchFailure::new(ErrorKind::UpstreamAuth, messages.api_key_error),
        Some(kind @ (ErrorKind::NetworkError | ErrorKind::Timeout)) => {
            SearchFailure::new(kind, messages.connectivity_error)
        }
        Some(kind) => SearchFailure::new(kind, message.unwrap_or_else(|| messages.generic_error.to_string())),
        None => {
            let kind = if status.is_client_error() { ErrorKind::InvalidInput } else { ErrorKind::UpstreamFailure };
            SearchFailure::new(kind, message.unwrap_or_else(|| messages.generic_error.to_string()))
        }
    }
}

fn search_params<'a>(
    name: &str, sites: impl Iterator<Item = &'a str>, location: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![("name", name.to_string()), ("sites", sites.collect::<Vec<_>>().join(","))];
    if let Some(location) = location {
        params.push(("location", location.to_string()));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use namescan_core::MemoryCache;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn item(title: &str, site: &str) -> serde_json::Value {
        json!({"title": title, "link": format!("https://{site}/{title}"), "snippet": "", "site": site})
    }

    fn client(server: &MockServer, policy: CachePolicy) -> SearchClient {
        SearchClient::new(&server.uri(), Arc::new(MemoryCache::new(100)), policy).unwrap()
    }

    #[tokio::test]
    async fn test_identical_search_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .and(query_param("name", "Jane Doe"))
            .and(query_param("sites", "linkedin.com,youtube.com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                item("a", "linkedin.com"),
                item("b", "linkedin.com")
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let sites = ["linkedin.com", "youtube.com"];

        assert_eq!(client.search("Jane Doe", &sites, None).await, SearchPhase::Success);
        assert_eq!(client.state().results.len(), 2);

        assert_eq!(client.search("  jane   doe ", &sites, Some("")).await, SearchPhase::Success);
        let state = client.state();
        assert_eq!(state.results.len(), 2);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([item("a", "tiktok.com")])))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::with_ttl(Duration::from_millis(50)));
        let sites = ["tiktok.com"];

        assert_eq!(client.search("Ana", &sites, None).await, SearchPhase::Success);
        assert_eq!(client.search("Ana", &sites, None).await, SearchPhase::Success);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(client.search("Ana", &sites, None).await, SearchPhase::Success);
    }

    #[tokio::test]
    async fn test_site_order_changes_the_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::never_expire());
        client.search("Ana", &["tiktok.com", "youtube.com"], None).await;
        client.search("Ana", &["youtube.com", "tiktok.com"], None).await;
        client.search("Ana", &["youtube.com", "tiktok.com", "youtube.com"], None).await;
    }

    #[tokio::test]
    async fn test_validation_happens_before_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&server).await;

        let client = client(&server, CachePolicy::default());
        let messages = Locale::En.messages();

        assert_eq!(client.search("  ", &["linkedin.com"], None).await, SearchPhase::Failed);
        let error = client.state().error.unwrap();
        assert_eq!(error.kind, ErrorKind::InvalidInput);
        assert_eq!(error.message, messages.enter_name);

        assert_eq!(client.search::<&str>("Jane", &[], None).await, SearchPhase::Failed);
        assert_eq!(client.state().error.unwrap().message, messages.select_site);
    }

    #[tokio::test]
    async fn test_rate_limited_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({"error": "quota", "code": "RATE_LIMITED"})))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        assert_eq!(client.search("Jane", &["linkedin.com"], None).await, SearchPhase::RateLimited);
        let state = client.state();
        assert!(!state.loading);
        assert_eq!(state.error.unwrap().message, Locale::En.messages().rate_limited);

        assert_eq!(client.search("Jane", &["linkedin.com"], None).await, SearchPhase::RateLimited);
    }

    #[tokio::test]
    async fn test_server_errors_use_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("name", "auth"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": "authentication failed", "code": "UPSTREAM_AUTH"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "boom"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({"error": "every site search failed", "code": "UPSTREAM_FAILURE"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "bare"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default()).with_locale(Locale::Fr);
        let messages = Locale::Fr.messages();

        assert_eq!(client.search("auth", &["linkedin.com"], None).await, SearchPhase::Failed);
        let error = client.state().error.unwrap();
        assert_eq!(error.kind, ErrorKind::UpstreamAuth);
        assert_eq!(error.message, messages.api_key_error);

        client.search("boom", &["linkedin.com"], None).await;
        let error = client.state().error.unwrap();
        assert_eq!(error.kind, ErrorKind::UpstreamFailure);
        assert_eq!(error.message, "every site search failed");

        client.search("bare", &["linkedin.com"], None).await;
        assert_eq!(client.state().error.unwrap().message, messages.generic_error);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let cache = Arc::new(MemoryCache::new(10));
        let client = SearchClient::new("http://127.0.0.1:1", cache, CachePolicy::default()).unwrap();
        assert_eq!(client.search("Jane", &["linkedin.com"], None).await, SearchPhase::Failed);
        let error = client.state().error.unwrap();
        assert_eq!(error.kind, ErrorKind::NetworkError);
        assert_eq!(error.message, Locale::En.messages().connectivity_error);
    }

    #[tokio::test]
    async fn test_latest_invocation_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("name", "slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([item("stale", "linkedin.com")]))
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("name", "fast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([item("fresh", "youtube.com")])))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let first = {
            let client = client.clone();
            tokio::spawn(async move { client.search("slow", &["linkedin.com"], None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(client.search("fast", &["youtube.com"], None).await, SearchPhase::Success);
        assert_eq!(first.await.unwrap(), SearchPhase::Aborted);

        tokio::time::sleep(Duration::from_millis(450)).await;
        let state = client.state();
        assert_eq!(state.phase, SearchPhase::Success);
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].title, "fresh");
    }

    #[tokio::test]
    async fn test_cancel_aborts_without_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let mut updates = client.subscribe();
        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.search("Jane", &["linkedin.com"], None).await })
        };

        updates.wait_for(|s| s.loading).await.unwrap();
        client.cancel();

        assert_eq!(task.await.unwrap(), SearchPhase::Aborted);
        let state = client.state();
        assert_eq!(state.phase, SearchPhase::Aborted);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_debounced_search_settles_when_stopped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let mut updates = client.subscribe();
        let debouncer = Debouncer::new(Duration::from_millis(10)).on_stop({
            let client = client.clone();
            move || client.cancel()
        });

        let searcher = client.clone();
        debouncer.trigger(async move {
            searcher.search("Jane", &["linkedin.com"], None).await;
        });
        updates.wait_for(|s| s.loading).await.unwrap();
        debouncer.cancel();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let state = client.state();
        assert_eq!(state.phase, SearchPhase::Aborted);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_retrigger_stops_running_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let mut updates = client.subscribe();
        let debouncer = Debouncer::new(Duration::from_millis(10)).on_stop({
            let client = client.clone();
            move || client.cancel()
        });

        let searcher = client.clone();
        debouncer.trigger(async move {
            searcher.search("Jane", &["linkedin.com"], None).await;
        });
        updates.wait_for(|s| s.loading).await.unwrap();

        debouncer.trigger(async {});
        let state = client.state();
        assert_eq!(state.phase, SearchPhase::Aborted);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_cancel_stops_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/search/report"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"results": [], "failures": []}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let task = {
            let client = client.clone();
            tokio::spawn(async move { client.search_report("Jane", &["linkedin.com"], None).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.cancel();

        let failure = task.await.unwrap().unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Cancelled);
        assert_eq!(client.state().phase, SearchPhase::Idle);

        let report = client.search_report("Jane", &["linkedin.com"], None).await.unwrap();
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_allowed_sites_and_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(["linkedin.com", "youtube.com"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/search/report"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [item("a", "linkedin.com")],
                "failures": [{"site": "youtube.com", "code": "TIMEOUT", "message": "request timeout"}]
            })))
            .mount(&server)
            .await;

        let client = client(&server, CachePolicy::default());
        let sites = client.allowed_sites().await.unwrap();
        assert_eq!(sites.len(), 2);

        let report = client.search_report("Jane", &["linkedin.com", "youtube.com"], None).await.unwrap();
        assert!(report.is_partial());
        assert_eq!(report.failures[0].code, ErrorKind::Timeout);
    }

    #[test]
    fn test_classify_without_body() {
        let messages = Locale::En.messages();
        let failure = classify(StatusCode::BAD_REQUEST, None, messages);
        assert_eq!(failure.kind, ErrorKind::InvalidInput);
        assert_eq!(failure.message, messages.generic_error);

        let body = ErrorBody { error: "Failed to fetch search results".into(), code: None };
        let failure = classify(StatusCode::INTERNAL_SERVER_ERROR, Some(body), messages);
        assert_eq!(failure.kind, ErrorKind::UpstreamFailure);
        assert_eq!(failure.message, "Failed to fetch search results");
    }
}
