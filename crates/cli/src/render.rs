//! Plain-text rendering of search outcomes.

use namescan_core::{Messages, ResultItem, SiteFailure, site_counts, summarize_counts};
use std::fmt::Write;

/// Counts line followed by one block per result, or the no-results line.
pub fn results(items: &[ResultItem], name: &str, messages: &Messages) -> String {
    if items.is_empty() {
        return format!("{} \"{}\"\n", messages.no_results, name.trim());
    }

    let counts = summarize_counts(&site_counts(items), messages.count_joiner);
    let mut out = format!("{}: {counts}\n", messages.results_found);
    for item in items {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", item.title);
        let _ = writeln!(out, "  {}", item.link);
        if !item.snippet.trim().is_empty() {
            let _ = writeln!(out, "  {}", item.snippet.trim());
        }
        let _ = writeln!(out, "  {}: {}", messages.from, item.site);
    }
    out
}

/// Interactive-mode header: sites in scope, location hint and the input prompt.
pub fn banner(messages: &Messages, sites: &[String], location: Option<&str>) -> String {
    let mut out = format!("{}\n{}: {}\n", messages.title, messages.select_sites, sites.join(", "));
    match location {
        Some(location) => {
            let _ = writeln!(out, "--location {location}");
        }
        None => {
            let _ = writeln!(out, "--location: {}", messages.location_placeholder);
        }
    }
    let _ = writeln!(out, "{} > {}", messages.search_button, messages.search_placeholder);
    out
}

/// One line per site that failed in a partial search.
pub fn failures(failures: &[SiteFailure]) -> String {
    let mut out = String::new();
    for failure in failures {
        let _ = writeln!(out, "! {} ({}): {}", failure.site, failure.code, failure.message);
    }
    out
}
