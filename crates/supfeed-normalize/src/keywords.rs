use std::collections::HashSet;

const DEFAULT_CITIES: &[&str] = &[
    "Алматы",
    "Астана",
    "Шымкент",
    "Караганда",
    "Актобе",
    "Тараз",
    "Павлодар",
    "Усть-Каменогорск",
    "Семей",
    "Костанай",
    "Кызылорда",
    "Уральск",
    "Петропавловск",
    "Атырау",
    "Актау",
    "Кокшетау",
    "Талдыкорган",
    "Туркестан",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordConfig {
    /// Appended after every other term, for regional search matching.
    pub cities: Vec<String>,
    pub max_name_tokens: usize,
    /// Name tokens shorter than this (in characters) are skipped.
    pub min_token_len: usize,
    /// Added when everything else collapses to a single term. If that still
    /// leaves one term, built-in city names fill in, so the result always
    /// carries a separator.
    pub fallback_term: String,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            cities: DEFAULT_CITIES.iter().map(|c| (*c).to_string()).collect(),
            max_name_tokens: 8,
            min_token_len: 1,
            fallback_term: "Казахстан".to_string(),
        }
    }
}

fn name_tokens<'a>(name: &'a str, config: &KeywordConfig) -> impl Iterator<Item = &'a str> {
    let min_len = config.min_token_len;
    name.split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '.'))
        .map(|token| token.trim_matches(|c| c == '-' || c == '.'))
        .filter(move |token| token.chars().count() >= min_len.max(1))
        .take(config.max_name_tokens)
}

fn push_term(terms: &mut Vec<String>, seen: &mut HashSet<String>, term: &str) {
    let term = term.trim();
    if !term.is_empty() && seen.insert(term.to_lowercase()) {
        terms.push(term.to_string());
    }
}

/// Builds the comma-joined keyword string for one offer.
///
/// Order: vendor, full name, name tokens, `extra`, cities. Terms are
/// deduplicated case-insensitively, first occurrence wins.
#[must_use]
pub fn build_keywords(vendor: &str, name: &str, extra: &[String], config: &KeywordConfig) -> String {
    let mut seen = HashSet::new();
    let mut terms = Vec::new();

    push_term(&mut terms, &mut seen, vendor);
    push_term(&mut terms, &mut seen, name);
    for token in name_tokens(name, config) {
        push_term(&mut terms, &mut seen, token);
    }
    for term in extra.iter().chain(&config.cities) {
        push_term(&mut terms, &mut seen, term);
    }
    if terms.len() < 2 {
        push_term(&mut terms, &mut seen, &config.fallback_term);
    }
    for city in DEFAULT_CITIES {
        if terms.len() >= 2 {
            break;
        }
        push_term(&mut terms, &mut seen, city);
    }

    terms.join(", ")
}
