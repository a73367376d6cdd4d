//! `GET /api/search` and `GET /api/search/report`.
//!
//! Both take `name`, an optional comma-separated `sites` filter and an
//! optional `location`. A missing `sites`, or one naming no site at all
//! (blank, `,`), means every allowed site.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use namescan_core::{FanoutPolicy, ResultItem, SearchReport, parse_site_list};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handler::AppState;

/// Query-string parameters shared by both search routes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Name to look up. Blank is rejected with 400.
    #[serde(default)]
    pub name: String,

    /// Comma-separated site filter, intersected with the allow-list.
    #[serde(default)]
    pub sites: Option<String>,

    /// Free-text location qualifier.
    #[serde(default)]
    pub location: Option<String>,
}

impl SearchParams {
    pub fn requested_sites(&self) -> Option<Vec<String>> {
        self.sites.as_deref().map(parse_site_list).filter(|sites| !sites.is_empty())
    }
}

/// Aggregated results as a flat, site-major JSON array.
pub async fn search(
    State(state): State<AppState>, params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<ResultItem>>, ApiError> {
    let Query(params) = params?;
    let aggregator = state.aggregator()?;
    let requested = params.requested_sites();

    let results = aggregator.search(&params.name, requested.as_deref(), params.location.as_deref()).await?;
    Ok(Json(results))
}

/// Best-effort results plus the manifest of sites that failed.
pub async fn search_report(
    State(state): State<AppState>, params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchReport>, ApiError> {
    let Query(params) = params?;
    let aggregator = state.aggregator()?;
    let requested = params.requested_sites();

    let report = aggregator
        .search_report(&params.name, requested.as_deref(), params.location.as_deref(), FanoutPolicy::Partial)
        .await?;
    Ok(Json(report))
}
