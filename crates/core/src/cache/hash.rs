//! Cache key derivation for search requests.
//!
//! The key is a pure function of the request. Name and location are
//! trimmed, inner whitespace collapsed and lowercased, and a missing
//! location is the same as an empty one. Site order is kept because it
//! decides the order of the aggregated results; repeated sites collapse to
//! their first occurrence.

use sha2::{Digest, Sha256};

use crate::sites::SiteDomain;

/// Derived cache key: the canonical request text and its SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    canonical: String,
    hash: String,
}

impl CacheKey {
    pub fn new(name: &str, location: Option<&str>, sites: &[SiteDomain]) -> Self {
        let mut seen: Vec<&SiteDomain> = Vec::with_capacity(sites.len());
        for site in sites {
            if !seen.contains(&site) {
                seen.push(site);
            }
        }
        let sites = seen.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(",");

        let canonical = format!(
            "{}\n{}\n{}",
            normalize_text(name),
            location.map(normalize_text).unwrap_or_default(),
            sites
        );
        let hash = compute_cache_key(&canonical);

        Self { canonical, hash }
    }

    /// Hex-encoded SHA-256 of the canonical form.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Canonical request text, stored next to cached results for inspection.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Hex-encoded SHA-256 of an arbitrary canonical string.
pub fn compute_cache_key(canonical: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sites(list: &[&str]) -> Vec<SiteDomain> {
        list.iter().map(|s| SiteDomain::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_key_stability() {
        let a = CacheKey::new("Jane Doe", Some("Paris"), &sites(&["linkedin.com", "youtube.com"]));
        let b = CacheKey::new("Jane Doe", Some("Paris"), &sites(&["linkedin.com", "youtube.com"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_key_normalizes_name_and_location() {
        let a = CacheKey::new("  Jane   DOE ", Some(" paris "), &sites(&["linkedin.com"]));
        let b = CacheKey::new("jane doe", Some("Paris"), &sites(&["linkedin.com"]));
        assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn test_missing_location_equals_empty() {
        let a = CacheKey::new("jane", None, &sites(&["linkedin.com"]));
        let b = CacheKey::new("jane", Some("   "), &sites(&["linkedin.com"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_location_changes_key() {
        let a = CacheKey::new("jane", None, &sites(&["linkedin.com"]));
        let b = CacheKey::new("jane", Some("Lyon"), &sites(&["linkedin.com"]));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_site_order_changes_key() {
        let a = CacheKey::new("jane", None, &sites(&["linkedin.com", "youtube.com"]));
        let b = CacheKey::new("jane", None, &sites(&["youtube.com", "linkedin.com"]));
        assert_ne!(a.hash(), b.hash());
    }

    #[test]
    fn test_repeated_sites_collapse() {
        let a = CacheKey::new("jane", None, &sites(&["linkedin.com", "linkedin.com", "youtube.com"]));
        let b = CacheKey::new("jane", None, &sites(&["linkedin.com", "youtube.com"]));
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_format() {
        let key = CacheKey::new("jane", None, &sites(&["linkedin.com"]));
        assert_eq!(key.hash().len(), 64);
        assert!(key.hash().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key.canonical(), "jane\n\nlinkedin.com");
    }
}
