//! Fan-out search aggregation.
//!
//! One upstream query per allowed site, all in flight at once on the calling
//! task, results concatenated site-major in the order the sites were resolved.

use async_trait::async_trait;
use futures_util::future::{join_all, try_join_all};
use namescan_core::{AllowList, AppConfig, Error, FanoutPolicy, ResultItem, SearchReport, SiteFailure};
use std::time::Instant;

use crate::google::{GoogleClient, SiteQuery, UpstreamError};

/// A source of per-site results.
#[async_trait]
pub trait SiteSearcher: Send + Sync {
    async fn search_site(&self, query: &SiteQuery) -> Result<Vec<ResultItem>, UpstreamError>;
}

/// Aggregates per-site searches for one name.
pub struct SearchAggregator<S = GoogleClient> {
    searcher: S,
    allow_list: AllowList,
    policy: FanoutPolicy,
    include_location: bool,
}

impl SearchAggregator<GoogleClient> {
    /// Build an aggregator over the upstream API using the application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let client = GoogleClient::from_app_config(config)?;
        Ok(Self::new(client, config.allow_list())
            .with_policy(config.fanout_policy)
            .with_location(config.include_location))
    }
}

impl<S: SiteSearcher> SearchAggregator<S> {
    pub fn new(searcher: S, allow_list: AllowList) -> Self {
        Self { searcher, allow_list, policy: FanoutPolicy::default(), include_location: false }
    }

    pub fn with_policy(mut self, policy: FanoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Append the caller's location to every upstream query.
    pub fn with_location(mut self, include_location: bool) -> Self {
        self.include_location = include_location;
        self
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn policy(&self) -> FanoutPolicy {
        self.policy
    }

    /// Search `name` across `requested` sites (or every allowed site).
    ///
    /// Under [`FanoutPolicy::FailFast`] any failing site fails the whole call.
    /// Under [`FanoutPolicy::Partial`] failed sites are logged and skipped.
    pub async fn search<T: AsRef<str>>(
        &self, name: &str, requested: Option<&[T]>, location: Option<&str>,
    ) -> Result<Vec<ResultItem>, Error> {
        Ok(self.search_report(name, requested, location, self.policy).await?.results)
    }

    /// Search and report per-site failures alongside the results.
    ///
    /// The manifest is only ever non-empty under [`FanoutPolicy::Partial`].
    pub async fn search_report<T: AsRef<str>>(
        &self, name: &str, requested: Option<&[T]>, location: Option<&str>, policy: FanoutPolicy,
    ) -> Result<SearchReport, Error> {
        let queries = self.plan(name, requested, location)?;
        let start = Instant::now();

        tracing::debug!(sites = queries.len(), ?policy, "fanning out site searches");

        let report = match policy {
            FanoutPolicy::FailFast => self.fail_fast(&queries).await?,
            FanoutPolicy::Partial => self.partial(&queries).await?,
        };

        tracing::info!(
            sites = queries.len(),
            results = report.results.len(),
            failed_sites = report.failures.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "aggregated search completed"
        );

        Ok(report)
    }

    /// Validate input and build one query per resolved site.
    fn plan<T: AsRef<str>>(
        &self, name: &str, requested: Option<&[T]>, location: Option<&str>,
    ) -> Result<Vec<SiteQuery>, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("name cannot be empty".to_string()));
        }

        let sites = self.allow_list.resolve(requested);
        if sites.is_empty() {
            return Err(Error::NoSites("no requested site is on the allow-list".to_string()));
        }

        let location = if self.include_location { location } else { None };
        Ok(sites.into_iter().map(|site| SiteQuery::new(site, name).with_location(location)).collect())
    }

    async fn fail_fast(&self, queries: &[SiteQuery]) -> Result<SearchReport, Error> {
        let per_site = try_join_all(queries.iter().map(|query| async move {
            self.searcher.search_site(query).await.inspect_err(|e| {
                tracing::warn!(site = %query.site, error = %e, "site search failed, aborting batch");
            })
        }))
        .await?;

        for (query, items) in queries.iter().zip(&per_site) {
            tracing::debug!(site = %query.site, count = items.len(), "site results");
        }

        Ok(SearchReport { results: per_site.into_iter().flatten().collect(), failures: Vec::new() })
    }

    async fn partial(&self, queries: &[SiteQuery]) -> Result<SearchReport, Error> {
        let outcomes = join_all(queries.iter().map(|query| self.searcher.search_site(query))).await;

        let mut report = SearchReport::default();
        let mut errors = Vec::new();
        for (query, outcome) in queries.iter().zip(outcomes) {
            match outcome {
                Ok(items) => {
                    tracing::debug!(site = %query.site, count = items.len(), "site results");
                    report.results.extend(items);
                }
                Err(e) => {
                    tracing::warn!(site = %query.site, error = %e, "site search failed");
                    let err = Error::from(e);
                    report.failures.push(SiteFailure { site: query.site.clone(), code: err.kind(), message: err.message() });
                    errors.push(err);
                }
            }
        }

        if errors.len() == queries.len() {
            return Err(all_failed(errors));
        }

        Ok(report)
    }
}

/// Collapse the per-site errors of a batch where nothing succeeded.
///
/// A shared cause is kept so that, for example, a rate limit still surfaces as 429.
fn all_failed(mut errors: Vec<Error>) -> Error {
    let first = errors.swap_remove(0);
    let kind = first.kind();
    if errors.iter().all(|e| e.kind() == kind) {
        return first;
    }

    Error::Upstream(format!("every site search failed (first: {})", first.message()))
}
