//! Result records shared by the aggregator, the endpoint and the client.

use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ErrorKind;
use crate::sites::SiteDomain;

/// Upstream fields the front end renders as text.
const TEXT_FIELDS: [&str; 3] = ["title", "link", "snippet"];

/// One upstream hit, tagged with the site it was searched on.
///
/// `site` is attached by the aggregator. Every other upstream field is kept
/// verbatim and the object stays flat on the wire. `title`, `link` and
/// `snippet` are exposed as text; when upstream sends one of them as anything
/// other than a string, the text is empty and the raw value stays in `extra`
/// under the same key, which is what gets serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultItem {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub site: SiteDomain,
    pub extra: Map<String, Value>,
}

impl ResultItem {
    /// Tag a raw upstream item with its site.
    ///
    /// An upstream `site` field, if any, is overwritten.
    pub fn from_upstream(mut fields: Map<String, Value>, site: SiteDomain) -> Self {
        let mut take = |key: &str| match fields.remove(key) {
            Some(Value::String(s)) => s,
            Some(raw) => {
                fields.insert(key.to_string(), raw);
                String::new()
            }
            None => String::new(),
        };
        let title = take("title");
        let link = take("link");
        let snippet = take("snippet");
        fields.remove("site");

        Self { title, link, snippet, site, extra: fields }
    }
}

impl Serialize for ResultItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 4))?;
        for (key, text) in TEXT_FIELDS.into_iter().zip([&self.title, &self.link, &self.snippet]) {
            match self.extra.get(key) {
                Some(raw) => map.serialize_entry(key, raw)?,
                None => map.serialize_entry(key, text)?,
            }
        }
        map.serialize_entry("site", &self.site)?;
        for (key, value) in self.extra.iter().filter(|(k, _)| !TEXT_FIELDS.contains(&k.as_str())) {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ResultItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        let site = fields.remove("site").ok_or_else(|| <D::Error as de::Error>::missing_field("site"))?;
        let site = SiteDomain::deserialize(site).map_err(<D::Error as de::Error>::custom)?;
        Ok(Self::from_upstream(fields, site))
    }
}

/// A site whose upstream call failed during a partial fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteFailure {
    pub site: SiteDomain,
    pub code: ErrorKind,
    pub message: String,
}

/// Aggregated results plus the per-site failure manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub results: Vec<ResultItem>,
    #[serde(default)]
    pub failures: Vec<SiteFailure>,
}

impl SearchReport {
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Count results per site, in order of first appearance.
pub fn site_counts(results: &[ResultItem]) -> Vec<(SiteDomain, usize)> {
    let mut counts: Vec<(SiteDomain, usize)> = Vec::new();
    for item in results {
        match counts.iter_mut().find(|(site, _)| *site == item.site) {
            Some((_, n)) => *n += 1,
            None => counts.push((item.site.clone(), 1)),
        }
    }
    counts
}

/// Render counts as `2 on linkedin.com, 1 on youtube.com`.
pub fn summarize_counts(counts: &[(SiteDomain, usize)], joiner: &str) -> String {
    counts
        .iter()
        .map(|(site, n)| format!("{n} {joiner} {site}"))
        .collect::<Vec<_>>()
        .join(", ")
}
