//! User-facing message catalog.

use serde::{Deserialize, Serialize};

/// Supported display languages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

/// Every string a front end shows around a search.
#[derive(Debug, Clone, Copy)]
pub struct Messages {
    pub title: &'static str,
    pub search_placeholder: &'static str,
    pub location_placeholder: &'static str,
    pub select_sites: &'static str,
    pub search_button: &'static str,
    pub loading: &'static str,
    pub no_results: &'static str,
    pub results_found: &'static str,
    pub count_joiner: &'static str,
    pub from: &'static str,
    pub enter_name: &'static str,
    pub select_site: &'static str,
    pub rate_limited: &'static str,
    pub generic_error: &'static str,
    pub connectivity_error: &'static str,
    pub api_key_error: &'static str,
}

const EN: Messages = Messages {
    title: "Social Media Search",
    search_placeholder: "Enter name to search",
    location_placeholder: "Enter location (e.g., Antananarivo, France, etc.)",
    select_sites: "Select sites to search",
    search_button: "Search",
    loading: "Loading search results...",
    no_results: "No results found for",
    results_found: "Results found",
    count_joiner: "on",
    from: "From",
    enter_name: "Please enter a name to search",
    select_site: "Please select at least one site",
    rate_limited: "Rate limit exceeded. Please try again later.",
    generic_error: "Something went wrong",
    connectivity_error: "Failed to fetch results. Please check your connection.",
    api_key_error: "The search service is misconfigured (API key rejected).",
};

const FR: Messages = Messages {
    title: "Recherche sur les réseaux sociaux",
    search_placeholder: "Entrez le nom à rechercher",
    location_placeholder: "Entrez la localisation (ex : Antananarivo, France, etc.)",
    select_sites: "Sélectionnez les sites à rechercher",
    search_button: "Rechercher",
    loading: "Chargement des résultats de recherche...",
    no_results: "Aucun résultat trouvé pour",
    results_found: "Résultats trouvés",
    count_joiner: "sur",
    from: "De",
    enter_name: "Veuillez entrer un nom à rechercher",
    select_site: "Veuillez sélectionner au moins un site",
    rate_limited: "Limite de requêtes atteinte. Veuillez réessayer plus tard.",
    generic_error: "Une erreur est survenue",
    connectivity_error: "Impossible de récupérer les résultats. Vérifiez votre connexion.",
    api_key_error: "Le service de recherche est mal configuré (clé API refusée).",
};

impl Locale {
    /// Pick a locale from a language tag such as `fr_FR.UTF-8` or `en-US`.
    ///
    /// Unknown tags fall back to English.
    pub fn from_tag(tag: &str) -> Self {
        let lang = tag.split(['_', '-', '.']).next().unwrap_or_default().to_ascii_lowercase();
        match lang.as_str() {
            "fr" => Locale::Fr,
            _ => Locale::En,
        }
    }

    /// Detect from `LC_ALL`, `LC_MESSAGES`, then `LANG`.
    pub fn detect() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.is_empty() && v != "C" && v != "POSIX")
            .map(|v| Self::from_tag(&v))
            .unwrap_or_default()
    }

    pub fn messages(self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::Fr => &FR,
        }
    }
}
