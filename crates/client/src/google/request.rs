//! Per-site query construction for the Custom Search JSON API.

use namescan_core::SiteDomain;
use serde::Serialize;

use super::UpstreamError;

/// Maximum query length accepted upstream.
const MAX_QUERY_CHARS: usize = 2048;

/// One upstream query: a name scoped to a single site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteQuery {
    pub site: SiteDomain,
    pub name: String,
    /// Appended to the query text when set.
    pub location: Option<String>,
}

impl SiteQuery {
    pub fn new(site: SiteDomain, name: impl Into<String>) -> Self {
        Self { site, name: name.into(), location: None }
    }

    pub fn with_location(mut self, location: Option<&str>) -> Self {
        self.location = location.map(str::trim).filter(|l| !l.is_empty()).map(str::to_string);
        self
    }

    /// Query text: `site:<domain> <name>[ <location>]`.
    pub fn q(&self) -> String {
        let mut q = format!("site:{} {}", self.site, self.name.trim());
        if let Some(location) = &self.location {
            q.push(' ');
            q.push_str(location);
        }
        q
    }

    /// Validate the query before it leaves the process.
    pub fn validate(&self) -> Result<(), UpstreamError> {
        if self.name.trim().is_empty() {
            return Err(UpstreamError::InvalidQuery("name cannot be empty".to_string()));
        }

        let len = self.q().chars().count();
        if len > MAX_QUERY_CHARS {
            return Err(UpstreamError::InvalidQuery(format!(
                "query too long: {len} chars (max {MAX_QUERY_CHARS})"
            )));
        }

        Ok(())
    }
}

/// Query-string parameters; reqwest URL-encodes them.
#[derive(Debug, Serialize)]
pub(crate) struct CustomSearchParams<'a> {
    pub key: &'a str,
    pub cx: &'a str,
    pub q: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(s: &str) -> SiteDomain {
        SiteDomain::parse(s).unwrap()
    }

    #[test]
    fn test_query_text() {
        let query = SiteQuery::new(site("linkedin.com"), " Jane Doe ");
        assert_eq!(query.q(), "site:linkedin.com Jane Doe");
    }

    #[test]
    fn test_query_with_location() {
        let query = SiteQuery::new(site("facebook.com"), "Jane Doe").with_location(Some(" Antananarivo "));
        assert_eq!(query.q(), "site:facebook.com Jane Doe Antananarivo");

        let blank = SiteQuery::new(site("facebook.com"), "Jane Doe").with_location(Some("  "));
        assert_eq!(blank.location, None);
    }

    #[test]
    fn test_empty_name() {
        let query = SiteQuery::new(site("tiktok.com"), "   ");
        assert!(matches!(query.validate(), Err(UpstreamError::InvalidQuery(_))));
    }

    #[test]
    fn test_query_too_long() {
        let query = SiteQuery::new(site("tiktok.com"), "a".repeat(MAX_QUERY_CHARS));
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_params_are_url_encoded() {
        let params = CustomSearchParams { key: "k", cx: "c", q: SiteQuery::new(site("x.com"), "Zoé & co").q() };
        let url = reqwest::Client::new()
            .get("https://search.example/v1")
            .query(&params)
            .build()
            .unwrap()
            .url()
            .clone();
        assert_eq!(url.query(), Some("key=k&cx=c&q=site%3Ax.com+Zo%C3%A9+%26+co"));
    }
}
