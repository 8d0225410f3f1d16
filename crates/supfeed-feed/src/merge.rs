use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use supfeed_core::OutputEncoding;
use supfeed_normalize::{validate, FeedStats, ValidationRules};

use crate::assemble::{assemble, parse_counts, FeedCounts, FeedHeader};
use crate::error::FeedError;

static OFFER_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<offer\b[^>]*>").expect("valid regex"));

static OFFER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^<offer\b[^>]*\bid\s*=\s*"([^"]*)""#).expect("valid regex"));

static OFFER_AVAILABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<offer\b[^>]*\bavailable\s*=\s*"true""#).expect("valid regex")
});

const CDATA_OPEN: &str = "<![CDATA[";
const CDATA_CLOSE: &str = "]]>";
const OFFER_CLOSE: &str = "</offer>";

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub feed: String,
    pub stats: FeedStats,
    /// Offers dropped because an earlier feed already had their id.
    pub duplicates: usize,
}

/// End offset of the `</offer>` closing the offer whose body starts at
/// `from`. CDATA sections are skipped.
fn find_offer_end(text: &str, mut from: usize) -> Option<usize> {
    loop {
        let rest = &text[from..];
        let close = rest.find(OFFER_CLOSE)?;
        match rest.find(CDATA_OPEN) {
            Some(cdata) if cdata < close => {
                let after_open = from + cdata + CDATA_OPEN.len();
                let cdata_end = text[after_open..].find(CDATA_CLOSE)?;
                from = after_open + cdata_end + CDATA_CLOSE.len();
            }
            _ => return Some(from + close + OFFER_CLOSE.len()),
        }
    }
}

/// Complete `<offer>...</offer>` blocks of a feed, in document order.
/// An unterminated trailing offer is ignored.
#[must_use]
pub fn offer_blocks(feed: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut pos = 0;
    while let Some(open) = OFFER_OPEN.find_at(feed, pos) {
        let Some(end) = find_offer_end(feed, open.end()) else {
            break;
        };
        blocks.push(&feed[open.start()..end]);
        pos = end;
    }
    blocks
}

fn offer_id(block: &str) -> Option<&str> {
    OFFER_ID
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Combines several supplier feeds into one.
///
/// The first offer seen for an id wins; later ones are dropped and counted.
/// "Before" counts are summed from each input's metadata block (falling
/// back to its offer count), the rest are recomputed. The result is
/// validated before it is returned.
///
/// # Errors
///
/// Returns [`FeedError::NoInputs`] for an empty input list and
/// [`FeedError::Validation`] if the merged feed breaks an invariant.
pub fn merge(
    feeds: &[String],
    header: &FeedHeader,
    rules: &ValidationRules,
    encoding: OutputEncoding,
) -> Result<MergeOutcome, FeedError> {
    if feeds.is_empty() {
        return Err(FeedError::NoInputs);
    }

    let mut seen = HashSet::new();
    let mut kept: Vec<String> = Vec::new();
    let mut before = 0;
    let mut duplicates = 0;

    for feed in feeds {
        let blocks = offer_blocks(feed);
        before += parse_counts(feed).map_or(blocks.len(), |c| c.before);

        for block in blocks {
            let id = offer_id(block).unwrap_or_default();
            if !id.is_empty() && !seen.insert(id.to_string()) {
                tracing::warn!(id, "duplicate offer id dropped while merging");
                duplicates += 1;
                continue;
            }
            kept.push(block.to_string());
        }
    }

    let available = kept
        .iter()
        .filter(|b| OFFER_AVAILABLE.is_match(b))
        .count();
    let counts = FeedCounts {
        before,
        after: kept.len(),
        available,
        unavailable: kept.len() - available,
    };

    let feed = assemble(header, &counts, &kept, encoding);
    let stats = validate(&feed, rules)?;

    tracing::info!(
        inputs = feeds.len(),
        offers = stats.offers,
        duplicates,
        "feeds merged"
    );

    Ok(MergeOutcome {
        feed,
        stats,
        duplicates,
    })
}

#[cfg(test)]
#[path = "merge_test.rs"]
mod tests;
