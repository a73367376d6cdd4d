//! Site domains and the server-controlled allow-list.
//!
//! A requested domain that is not on the allow-list, or is not a domain at
//! all, is dropped silently. Filtering never fails; an empty outcome is the
//! caller's to reject.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

/// Sites queried when no allow-list is configured.
pub const DEFAULT_SITES: &[&str] = &[
    "linkedin.com",
    "twitter.com",
    "youtube.com",
    "facebook.com",
    "instagram.com",
    "tiktok.com",
    "pinterest.com",
];

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("domain pattern is valid")
});

/// A single social platform domain, e.g. `linkedin.com`.
///
/// Always lowercase and trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SiteDomain(String);

impl SiteDomain {
    /// Normalize and validate a domain string.
    pub fn parse(raw: &str) -> Option<Self> {
        let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
        if domain.len() > 253 || !DOMAIN_RE.is_match(&domain) {
            return None;
        }
        Some(Self(domain))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SiteDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for SiteDomain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SiteDomain::parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("not a domain: {raw:?}")))
    }
}

/// Ordered set of domains that may be queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList {
    sites: Vec<SiteDomain>,
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_SITES)
    }
}

impl AllowList {
    /// Build an allow-list, skipping malformed entries and duplicates.
    pub fn new<S: AsRef<str>>(sites: &[S]) -> Self {
        let mut out: Vec<SiteDomain> = Vec::with_capacity(sites.len());
        for site in sites.iter().filter_map(|s| SiteDomain::parse(s.as_ref())) {
            if !out.contains(&site) {
                out.push(site);
            }
        }
        Self { sites: out }
    }

    pub fn contains(&self, site: &SiteDomain) -> bool {
        self.sites.contains(site)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SiteDomain> {
        self.sites.iter()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Intersect `requested` with the allow-list.
    ///
    /// Keeps the requested order and the first occurrence of each domain.
    pub fn filter<S: AsRef<str>>(&self, requested: &[S]) -> Vec<SiteDomain> {
        let mut out: Vec<SiteDomain> = Vec::new();
        for site in requested.iter().filter_map(|s| SiteDomain::parse(s.as_ref())) {
            if self.contains(&site) && !out.contains(&site) {
                out.push(site);
            } else if !self.contains(&site) {
                tracing::debug!(site = %site, "dropping site outside the allow-list");
            }
        }
        out
    }

    /// Sites to query for an optional site filter; no filter means every allowed site.
    pub fn resolve<S: AsRef<str>>(&self, requested: Option<&[S]>) -> Vec<SiteDomain> {
        match requested {
            Some(requested) => self.filter(requested),
            None => self.sites.clone(),
        }
    }
}

/// Split a comma-separated `sites` parameter, dropping empty pieces.
pub fn parse_site_list(raw: &str) -> Vec<String> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}
