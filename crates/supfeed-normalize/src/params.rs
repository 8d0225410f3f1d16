//! Attribute cleanup and ordering.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use supfeed_core::Param;

use crate::text::{collapse_whitespace, strip_zero_width};

/// Latin `B` standing in for Cyrillic `В` in the watt unit (`Bт`, `кBт`).
static WATT_LOOKALIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\d\s(/])(к?)Bт").expect("valid regex"));

/// Value cut off by the supplier: a letter followed by an ellipsis at the end.
static TRUNCATED_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}(?:\.{3,}|…)$").expect("valid regex"));

const DEFAULT_DENY: &[&str] = &[
    "штрихкод",
    "штрих-код",
    "штрих код",
    "ean",
    "ean13",
    "ean-13",
    "barcode",
    "новинка",
    "new",
    "снижена цена",
    "код тн вэд",
    "тн вэд",
    "благотворительность",
    "остаток",
    "наличие",
];

/// Attribute names that never reach the output, compared case-insensitively.
#[derive(Debug, Clone)]
pub struct ParamPolicy {
    deny: HashSet<String>,
}

impl ParamPolicy {
    /// Adds supplier-specific names on top of the current deny-list.
    #[must_use]
    pub fn with_extra<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.deny.extend(
            extra
                .into_iter()
                .map(|name| normalize_deny_key(name.as_ref()))
                .filter(|name| !name.is_empty()),
        );
        self
    }

    #[must_use]
    pub fn is_denied(&self, name: &str) -> bool {
        self.deny.contains(&normalize_deny_key(name))
    }
}

impl Default for ParamPolicy {
    fn default() -> Self {
        Self {
            deny: DEFAULT_DENY.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

fn normalize_deny_key(name: &str) -> String {
    collapse_whitespace(&strip_zero_width(name)).to_lowercase()
}

fn fix_watt(s: &str) -> String {
    WATT_LOOKALIKE.replace_all(s, "${1}${2}Вт").into_owned()
}

fn clean_key(raw: &str) -> String {
    let collapsed = collapse_whitespace(&strip_zero_width(raw));
    let stripped = collapsed
        .trim_start_matches(|c: char| !c.is_alphanumeric())
        .trim_end_matches(|c: char| c == ':' || c.is_whitespace());
    fix_watt(stripped)
}

fn clean_value(raw: &str) -> String {
    fix_watt(&collapse_whitespace(&strip_zero_width(raw)))
}

fn is_noise_value(value: &str) -> bool {
    !value.chars().any(char::is_alphanumeric) || TRUNCATED_VALUE.is_match(value)
}

/// Normalizes attribute pairs and drops the ones that must not be published.
///
/// Keys lose zero-width characters, leading bullets, and trailing colons;
/// whitespace is collapsed everywhere and the `Bт` lookalike is repaired.
/// Pairs with an empty side, a denied key, a punctuation-only value, or a
/// visibly truncated value are dropped. Duplicate keys keep the first pair.
/// Running it on its own output changes nothing.
#[must_use]
pub fn clean_params(pairs: &[Param], policy: &ParamPolicy) -> Vec<Param> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(pairs.len());

    for pair in pairs {
        let name = clean_key(&pair.name);
        let value = clean_value(&pair.value);

        if name.is_empty() || value.is_empty() {
            continue;
        }
        if policy.is_denied(&name) {
            tracing::debug!(param = %name, "dropping denied param");
            continue;
        }
        if is_noise_value(&value) {
            tracing::debug!(param = %name, value = %value, "dropping noise or truncated value");
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            tracing::debug!(param = %name, "dropping duplicate param");
            continue;
        }
        out.push(Param { name, value });
    }

    out
}

/// Orders params: names on the priority list first, in list order, then the
/// rest alphabetically. Matching and sorting are case-insensitive.
#[must_use]
pub fn sort_params(pairs: &[Param], priority: &[String]) -> Vec<Param> {
    let priority: Vec<String> = priority.iter().map(|p| p.to_lowercase()).collect();
    let mut sorted = pairs.to_vec();
    sorted.sort_by_cached_key(|p| {
        let lower = p.name.to_lowercase();
        let rank = priority
            .iter()
            .position(|candidate| *candidate == lower)
            .unwrap_or(usize::MAX);
        (rank, lower)
    });
    sorted
}

#[cfg(test)]
#[path = "params_test.rs"]
mod tests;
