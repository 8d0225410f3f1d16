//! Header, metadata comment, and footer around rendered offer blocks.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, FixedOffset, NaiveTime};
use regex::Regex;
use supfeed_core::OutputEncoding;

use crate::error::FeedError;

const META_LABEL_WIDTH: usize = 25;

static META_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(Offers before filter|Offers after filter|Available \(true\)|Unavailable \(false\))\s*\|\s*(\d+)\s*$")
        .expect("valid regex")
});

/// Who the feed is for and when it was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedHeader {
    pub supplier: String,
    pub supplier_url: String,
    pub built_at: DateTime<FixedOffset>,
    pub next_build: DateTime<FixedOffset>,
}

impl FeedHeader {
    #[must_use]
    pub fn new(
        supplier: impl Into<String>,
        supplier_url: impl Into<String>,
        built_at: DateTime<FixedOffset>,
        build_hour: u8,
    ) -> Self {
        Self {
            supplier: supplier.into(),
            supplier_url: supplier_url.into(),
            built_at,
            next_build: next_build_at(built_at, build_hour),
        }
    }
}

/// Offer counts recorded in the metadata block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedCounts {
    /// Offers in the supplier catalog before category and validity filters.
    pub before: usize,
    pub after: usize,
    pub available: usize,
    pub unavailable: usize,
}

/// # Errors
///
/// Returns [`FeedError::InvalidOffset`] if `hours` is not a valid UTC offset.
pub fn feed_offset(hours: i32) -> Result<FixedOffset, FeedError> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .ok_or(FeedError::InvalidOffset(hours))
}

/// Next occurrence of `build_hour:00` strictly after `now`, in `now`'s offset.
#[must_use]
pub fn next_build_at(now: DateTime<FixedOffset>, build_hour: u8) -> DateTime<FixedOffset> {
    let time = NaiveTime::from_hms_opt(u32::from(build_hour % 24), 0, 0).unwrap_or(NaiveTime::MIN);
    let local = now.date_naive().and_time(time);
    let offset = *now.offset();
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    let candidate = DateTime::<FixedOffset>::from_naive_utc_and_offset(utc, offset);
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

fn meta_line(label: &str, value: impl std::fmt::Display) -> String {
    format!("{label:<width$}| {value}", width = META_LABEL_WIDTH)
}

/// Comments may not contain `--`.
fn comment_safe(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '-' && out.ends_with('-') {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

/// Builds the complete feed document around already rendered offer blocks.
#[must_use]
pub fn assemble(
    header: &FeedHeader,
    counts: &FeedCounts,
    offer_blocks: &[String],
    encoding: OutputEncoding,
) -> String {
    let meta = [
        meta_line("Supplier", comment_safe(&header.supplier)),
        meta_line("Supplier URL", comment_safe(&header.supplier_url)),
        meta_line("Built at", header.built_at.format("%Y-%m-%d %H:%M:%S")),
        meta_line("Next build", header.next_build.format("%Y-%m-%d %H:%M:%S")),
        meta_line("Offers before filter", counts.before),
        meta_line("Offers after filter", counts.after),
        meta_line("Available (true)", counts.available),
        meta_line("Unavailable (false)", counts.unavailable),
    ]
    .join("\n");

    let body = if offer_blocks.is_empty() {
        String::new()
    } else {
        format!("\n{}\n", offer_blocks.join("\n\n"))
    };

    let document = format!(
        "<?xml version=\"1.0\" encoding=\"{encoding}\"?>\n\
<yml_catalog date=\"{date}\">\n\
<!--FEED_META\n{meta}\n-->\n\
<shop><offers>\n{body}\n</offers>\n</shop>\n</yml_catalog>\n",
        encoding = encoding.label(),
        date = header.built_at.format("%Y-%m-%d %H:%M"),
    );

    encoding.represent(&document).into_owned()
}

/// Reads the counts back out of a feed's metadata block.
///
/// Returns `None` when the block is missing or incomplete.
#[must_use]
pub fn parse_counts(feed: &str) -> Option<FeedCounts> {
    let (mut before, mut after, mut available, mut unavailable) = (None, None, None, None);
    for caps in META_COUNT.captures_iter(feed) {
        let value = caps.get(2).and_then(|m| m.as_str().parse::<usize>().ok());
        match caps.get(1).map(|m| m.as_str()) {
            Some("Offers before filter") => before = value,
            Some("Offers after filter") => after = value,
            Some("Available (true)") => available = value,
            Some("Unavailable (false)") => unavailable = value,
            _ => {}
        }
    }
    Some(FeedCounts {
        before: before?,
        after: after?,
        available: available?,
        unavailable: unavailable?,
    })
}
