//! Custom Search JSON API response types and normalization.

use namescan_core::{ResultItem, SiteDomain};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Raw response body. `items` is absent when nothing matched.
#[derive(Debug, Default, Deserialize)]
pub struct CustomSearchResponse {
    #[serde(default)]
    pub items: Option<Vec<Map<String, Value>>>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub reason: Option<String>,
}

impl ApiErrorBody {
    /// Upstream answers a bad key with 400 rather than 401/403.
    pub fn is_key_invalid(&self) -> bool {
        self.errors.iter().any(|e| e.reason.as_deref() == Some("keyInvalid"))
    }
}

impl CustomSearchResponse {
    /// Tag every item with `site`, keeping upstream order.
    pub fn into_results(self, site: &SiteDomain) -> Vec<ResultItem> {
        self.items
            .unwrap_or_default()
            .into_iter()
            .map(|fields| ResultItem::from_upstream(fields, site.clone()))
            .collect()
    }
}

/// Best-effort decoding of an upstream error body.
pub(crate) fn parse_error(body: &[u8]) -> Option<ApiErrorBody> {
    serde_json::from_slice::<ApiErrorEnvelope>(body).ok().map(|e| e.error)
}
