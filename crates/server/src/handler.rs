//! Router and shared state.
//!
//! The aggregator is built once from [`AppConfig`] and shared by every
//! request. Without upstream credentials the server still starts and serves
//! `/api/sites`; searches then fail with `CONFIG_ERROR`.

use axum::Router;
use axum::routing::get;
use namescan_client::SearchAggregator;
use namescan_core::{AllowList, AppConfig, Error};
use std::sync::Arc;

use crate::routes;

/// State shared by route handlers.
#[derive(Clone)]
pub struct AppState {
    aggregator: Option<Arc<SearchAggregator>>,
    allow_list: Arc<AllowList>,
}

impl AppState {
    pub fn new(aggregator: SearchAggregator) -> Self {
        let allow_list = Arc::new(aggregator.allow_list().clone());
        Self { aggregator: Some(Arc::new(aggregator)), allow_list }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        match SearchAggregator::from_config(config) {
            Ok(aggregator) => Self::new(aggregator),
            Err(e) => {
                tracing::warn!(error = %e, "upstream search is not configured; searches will fail");
                Self { aggregator: None, allow_list: Arc::new(config.allow_list()) }
            }
        }
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn aggregator(&self) -> Result<&SearchAggregator, Error> {
        self.aggregator.as_deref().ok_or_else(|| {
            Error::Config("upstream credentials missing: set NAMESCAN_GOOGLE_API_KEY and NAMESCAN_GOOGLE_CX".into())
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/search", get(routes::search))
        .route("/api/search/report", get(routes::search_report))
        .route("/api/sites", get(routes::list_sites))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use namescan_client::{SearchClient, SearchPhase};
    use namescan_core::{CachePolicy, FanoutPolicy, MemoryCache};
    use serde_json::{Value, json};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(upstream: &MockServer) -> AppConfig {
        AppConfig {
            google_api_key: Some("test-key".into()),
            google_cx: Some("test-cx".into()),
            search_base_url: format!("{}/customsearch/v1", upstream.uri()),
            ..Default::default()
        }
    }

    async fn serve(state: AppState) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        addr
    }

    async fn mock_site(upstream: &MockServer, site: &str, body: Value, status: u16) {
        Mock::given(method("GET"))
            .and(query_param("q", format!("site:{site} Jane Doe")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(upstream)
            .await;
    }

    async fn fetch_json(addr: SocketAddr, path_and_query: &str) -> (u16, Value) {
        let response = reqwest::get(format!("http://{addr}{path_and_query}")).await.unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_search_route() {
        let upstream = MockServer::start().await;
        mock_site(
            &upstream,
            "linkedin.com",
            json!({"items": [
                {"title": "Jane Doe", "link": "https://linkedin.com/in/jane", "snippet": "a", "displayLink": "linkedin.com"},
                {"title": "Jane D.", "link": "https://linkedin.com/in/jd", "snippet": "b"}
            ]}),
            200,
        )
        .await;
        mock_site(&upstream, "youtube.com", json!({"kind": "customsearch#search"}), 200).await;

        let addr = serve(AppState::from_config(&config(&upstream))).await;
        let (status, body) =
            fetch_json(addr, "/api/search?name=Jane%20Doe&sites=linkedin.com,youtube.com,not-a-real-site.com").await;

        assert_eq!(status, 200);
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["site"], "linkedin.com");
        assert_eq!(items[0]["displayLink"], "linkedin.com");
        assert_eq!(items[1]["link"], "https://linkedin.com/in/jd");
    }

    #[tokio::test]
    async fn test_search_route_rejections() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(200)).expect(0).mount(&upstream).await;

        let addr = serve(AppState::from_config(&config(&upstream))).await;

        let (status, body) = fetch_json(addr, "/api/search?name=%20&sites=linkedin.com").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "INVALID_INPUT");

        let (status, body) = fetch_json(addr, "/api/search?name=Jane&sites=example.org").await;
        assert_eq!(status, 400);
        assert_eq!(body["code"], "NO_SITES");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_separator_only_sites_searches_every_allowed_site() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
                {"title": "Jane Doe", "link": "https://example.invalid/jane", "snippet": ""}
            ]})))
            .mount(&upstream)
            .await;

        let state = AppState::from_config(&config(&upstream));
        let allowed = state.allow_list().len();
        let addr = serve(state).await;

        let (status, body) = fetch_json(addr, "/api/search?name=Jane%20Doe&sites=,").await;
        assert_eq!(status, 200);
        assert_eq!(body.as_array().unwrap().len(), allowed);
    }

    #[tokio::test]
    async fn test_upstream_failures() {
        let upstream = MockServer::start().await;
        mock_site(&upstream, "linkedin.com", json!({"items": []}), 200).await;
        mock_site(&upstream, "twitter.com", json!({}), 429).await;
        mock_site(&upstream, "youtube.com", json!({"error": {"code": 500, "message": "Backend Error"}}), 500).await;

        let addr = serve(AppState::from_config(&config(&upstream))).await;

        let (status, body) = fetch_json(addr, "/api/search?name=Jane%20Doe&sites=linkedin.com,twitter.com").await;
        assert_eq!(status, 429);
        assert_eq!(body["code"], "RATE_LIMITED");

        let (status, body) = fetch_json(addr, "/api/search?name=Jane%20Doe&sites=linkedin.com,youtube.com").await;
        assert_eq!(status, 500);
        assert_eq!(body["code"], "UPSTREAM_FAILURE");
    }

    #[tokio::test]
    async fn test_report_route_is_partial() {
        let upstream = MockServer::start().await;
        mock_site(&upstream, "linkedin.com", json!({"items": [{"title": "t", "link": "l", "snippet": "s"}]}), 200).await;
        mock_site(&upstream, "youtube.com", json!({"error": {"code": 503, "message": "down"}}), 503).await;

        let state = AppState::from_config(&AppConfig { fanout_policy: FanoutPolicy::FailFast, ..config(&upstream) });
        let addr = serve(state).await;

        let (status, body) = fetch_json(addr, "/api/search/report?name=Jane%20Doe&sites=linkedin.com,youtube.com").await;
        assert_eq!(status, 200);
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["failures"][0]["site"], "youtube.com");
        assert_eq!(body["failures"][0]["code"], "UPSTREAM_FAILURE");
    }

    #[tokio::test]
    async fn test_sites_without_credentials() {
        let state = AppState::from_config(&AppConfig {
            allowed_sites: vec!["linkedin.com".into(), "tiktok.com".into()],
            ..Default::default()
        });
        let addr = serve(state).await;

        let (status, body) = fetch_json(addr, "/api/sites").await;
        assert_eq!(status, 200);
        assert_eq!(body, json!(["linkedin.com", "tiktok.com"]));

        let (status, body) = fetch_json(addr, "/api/search?name=Jane").await;
        assert_eq!(status, 500);
        assert_eq!(body["code"], "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn test_search_client_end_to_end() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "site:linkedin.com Jane Doe"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [
                {"title": "Jane Doe", "link": "https://linkedin.com/in/jane", "snippet": ""}
            ]})))
            .expect(1)
            .mount(&upstream)
            .await;
        mock_site(&upstream, "youtube.com", json!({}), 200).await;

        let addr = serve(AppState::from_config(&config(&upstream))).await;
        let client =
            SearchClient::new(&format!("http://{addr}"), Arc::new(MemoryCache::new(10)), CachePolicy::default())
                .unwrap();

        let sites = client.allowed_sites().await.unwrap();
        assert_eq!(sites.len(), 7);

        let requested = ["linkedin.com", "youtube.com"];
        assert_eq!(client.search("Jane Doe", &requested, None).await, SearchPhase::Success);
        assert_eq!(client.search("Jane Doe", &requested, None).await, SearchPhase::Success);

        let state = client.state();
        assert_eq!(state.results.len(), 1);
        assert_eq!(state.results[0].site.as_str(), "linkedin.com");
    }
}
