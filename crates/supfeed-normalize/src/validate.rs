//! Structural checks over an assembled feed.
//!
//! The feed is scanned as text, offer by offer, so a single run reports
//! every problem instead of stopping at the first parse error. CDATA
//! payloads are blanked before the scan; description HTML can never fake
//! an offer tag.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use supfeed_core::pricing::{PRICE_CEILING, SENTINEL_PRICE};

use crate::error::{ValidationError, Violation, ViolationKind};
use crate::params::ParamPolicy;
use crate::text::xml_unescape;

static OFFER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<offer\b([^>]*)>|</offer\s*>").expect("valid regex"));

static LEGACY_AVAILABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?available\b").expect("valid regex"));

static ID_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bid\s*=\s*"([^"]*)""#).expect("valid regex"));

static AVAILABLE_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bavailable\s*=\s*"([^"]*)""#).expect("valid regex"));

static PICTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<picture>([^<]*)</picture>").expect("valid regex"));

static VENDOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<vendorCode>([^<]*)</vendorCode>").expect("valid regex"));

static KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<keywords>([^<]*)</keywords>").expect("valid regex"));

static PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<price>([^<]*)</price>").expect("valid regex"));

static PARAM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<param\s+name\s*=\s*"([^"]*)""#).expect("valid regex"));

const DEFAULT_FORBIDDEN_TOKENS: &[&str] = &[
    // Cyrillic lookalikes of brand names.
    "НР",
    "Хerox",
    "Сanon",
];

/// Offer counts of a feed that passed validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedStats {
    pub offers: usize,
    pub available: usize,
    pub unavailable: usize,
}

#[derive(Debug, Clone)]
pub struct ValidationRules {
    pub deny: ParamPolicy,
    /// Misspelled brand tokens that must not appear anywhere in the feed.
    pub forbidden_tokens: Vec<String>,
    /// Offending subjects quoted per violation kind in the error message.
    pub sample_size: usize,
}

impl ValidationRules {
    #[must_use]
    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            deny: ParamPolicy::default(),
            forbidden_tokens: DEFAULT_FORBIDDEN_TOKENS
                .iter()
                .map(|t| (*t).to_string())
                .collect(),
            sample_size: 10,
        }
    }
}

#[derive(Clone, Copy)]
enum ScanState {
    Outside,
    Inside {
        attrs_start: usize,
        attrs_end: usize,
        body_start: usize,
        line: usize,
    },
}

/// 1-based line numbers for offsets visited in ascending order. Each call
/// only counts newlines since the previous offset.
struct LineCounter<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
}

impl<'a> LineCounter<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
        }
    }

    fn line_at(&mut self, offset: usize) -> usize {
        if offset < self.offset {
            self.offset = 0;
            self.line = 1;
        }
        self.line += self.text.as_bytes()[self.offset..offset]
            .iter()
            .filter(|&&b| b == b'\n')
            .count();
        self.offset = offset;
        self.line
    }
}

/// Replaces every CDATA section with blanks, keeping newlines so line
/// numbers stay meaningful.
fn blank_cdata(feed: &str) -> String {
    let mut out = String::with_capacity(feed.len());
    let mut rest = feed;
    while let Some(start) = rest.find("<![CDATA[") {
        out.push_str(&rest[..start]);
        let after = &rest[start..];
        let Some(end) = after.find("]]>") else {
            out.push_str(after);
            return out;
        };
        let section = &after[..end + 3];
        out.extend(section.chars().filter(|&c| c == '\n'));
        rest = &after[end + 3..];
    }
    out.push_str(rest);
    out
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim())
}

fn check_offer(
    attrs: &str,
    body: &str,
    line: usize,
    rules: &ValidationRules,
    seen_ids: &mut HashSet<String>,
    stats: &mut FeedStats,
    violations: &mut Vec<Violation>,
) {
    stats.offers += 1;
    if capture(&AVAILABLE_ATTR, attrs) == Some("true") {
        stats.available += 1;
    } else {
        stats.unavailable += 1;
    }

    let id = capture(&ID_ATTR, attrs).unwrap_or_default();
    let subject = if id.is_empty() {
        violations.push(Violation::new(ViolationKind::MissingId, format!("line {line}")));
        format!("line {line}")
    } else {
        if !seen_ids.insert(id.to_string()) {
            violations.push(Violation::new(ViolationKind::DuplicateId, id));
        }
        id.to_string()
    };

    let has_picture = PICTURE
        .captures_iter(body)
        .any(|c| c.get(1).is_some_and(|m| !m.as_str().trim().is_empty()));
    if !has_picture {
        violations.push(Violation::new(ViolationKind::MissingPicture, subject.as_str()));
    }

    if !id.is_empty() && capture(&VENDOR_CODE, body) != Some(id) {
        violations.push(Violation::new(
            ViolationKind::VendorCodeMismatch,
            subject.as_str(),
        ));
    }

    match capture(&KEYWORDS, body) {
        None | Some("") => {
            violations.push(Violation::new(ViolationKind::MissingKeywords, subject.as_str()));
        }
        Some(keywords) if !keywords.contains(',') => {
            violations.push(Violation::new(
                ViolationKind::KeywordsWithoutSeparator,
                subject.as_str(),
            ));
        }
        Some(_) => {}
    }

    let price_ok = capture(&PRICE, body)
        .and_then(|p| p.parse::<i64>().ok())
        .is_some_and(|p| (SENTINEL_PRICE..PRICE_CEILING).contains(&p));
    if !price_ok {
        violations.push(Violation::new(ViolationKind::PriceOutOfBounds, subject.as_str()));
    }

    for caps in PARAM_NAME.captures_iter(body) {
        let Some(name) = caps.get(1) else { continue };
        let name = xml_unescape(name.as_str());
        if rules.deny.is_denied(&name) {
            violations.push(Violation::new(
                ViolationKind::DeniedParam,
                format!("{subject}: {name}"),
            ));
        }
    }
}

/// Validates an assembled feed.
///
/// Returns the offer counts when the feed is clean.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every violation found.
pub fn validate(feed: &str, rules: &ValidationRules) -> Result<FeedStats, ValidationError> {
    let mut violations = Vec::new();

    for token in &rules.forbidden_tokens {
        let Ok(re) = Regex::new(&format!(r"\b{}\b", regex::escape(token))) else {
            continue;
        };
        let mut lines = LineCounter::new(feed);
        for m in re.find_iter(feed) {
            violations.push(Violation::new(
                ViolationKind::ForbiddenToken,
                format!("{token} at line {}", lines.line_at(m.start())),
            ));
        }
    }

    let text = blank_cdata(feed);

    let mut lines = LineCounter::new(&text);
    for m in LEGACY_AVAILABLE.find_iter(&text) {
        violations.push(Violation::new(
            ViolationKind::LegacyAvailableTag,
            format!("line {}", lines.line_at(m.start())),
        ));
    }

    let mut stats = FeedStats::default();
    let mut seen_ids = HashSet::new();
    let mut state = ScanState::Outside;
    let mut lines = LineCounter::new(&text);

    for caps in OFFER_TAG.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        let line = lines.line_at(whole.start());

        match (caps.get(1), state) {
            (Some(attrs), ScanState::Outside) => {
                state = ScanState::Inside {
                    attrs_start: attrs.start(),
                    attrs_end: attrs.end(),
                    body_start: whole.end(),
                    line,
                };
            }
            (Some(attrs), ScanState::Inside { line: open_line, .. }) => {
                violations.push(Violation::new(
                    ViolationKind::MalformedStructure,
                    format!("offer at line {open_line} not closed before line {line}"),
                ));
                state = ScanState::Inside {
                    attrs_start: attrs.start(),
                    attrs_end: attrs.end(),
                    body_start: whole.end(),
                    line,
                };
            }
            (None, ScanState::Outside) => {
                violations.push(Violation::new(
                    ViolationKind::MalformedStructure,
                    format!("stray </offer> at line {line}"),
                ));
            }
            (
                None,
                ScanState::Inside {
                    attrs_start,
                    attrs_end,
                    body_start,
                    line: open_line,
                },
            ) => {
                check_offer(
                    &text[attrs_start..attrs_end],
                    &text[body_start..whole.start()],
                    open_line,
                    rules,
                    &mut seen_ids,
                    &mut stats,
                    &mut violations,
                );
                state = ScanState::Outside;
            }
        }
    }

    if let ScanState::Inside { line, .. } = state {
        violations.push(Violation::new(
            ViolationKind::MalformedStructure,
            format!("offer at line {line} never closed"),
        ));
    }

    if violations.is_empty() {
        Ok(stats)
    } else {
        Err(ValidationError::new(violations, rules.sample_size))
    }
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
