//! Retail price calculation.
//!
//! `raw * (100 + percent) / 100 + tier add-on`, then rounded up to the next
//! value ending in the table's tail. Anything outside the publishable band
//! collapses to [`SENTINEL_PRICE`].

use supfeed_core::pricing::{MIN_RAW_PRICE, PRICE_CEILING, SENTINEL_PRICE};
use supfeed_core::PricingTable;

/// Computes the listing price for a dealer price.
///
/// Total over every input: absent, non-positive, too small, or too large raw
/// prices yield [`SENTINEL_PRICE`], and the arithmetic saturates.
#[must_use]
pub fn compute_price(raw: Option<i64>, table: &PricingTable) -> i64 {
    let Some(raw) = raw else {
        return SENTINEL_PRICE;
    };
    if raw < MIN_RAW_PRICE || raw >= PRICE_CEILING {
        return SENTINEL_PRICE;
    }

    let marked_up = raw.saturating_mul(100 + i64::from(table.percent)) / 100;
    let with_add_on = marked_up.saturating_add(table.add_on_for(raw));
    let price = round_up_to_tail(with_add_on, i64::from(table.tail));

    if (SENTINEL_PRICE..PRICE_CEILING).contains(&price) {
        price
    } else {
        SENTINEL_PRICE
    }
}

/// Smallest value `>= value` whose last three digits equal `tail`.
fn round_up_to_tail(value: i64, tail: i64) -> i64 {
    let candidate = value.div_euclid(1000).saturating_mul(1000).saturating_add(tail);
    if candidate < value {
        candidate.saturating_add(1000)
    } else {
        candidate
    }
}

/// Parses a supplier price string such as `"41 300,00"` or `"12500.5"` into
/// whole currency units. Fractions are truncated. Returns `None` for anything
/// that is not a plain number.
#[must_use]
pub fn parse_raw_price(s: &str) -> Option<i64> {
    let compact: String = s
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let integer = compact
        .split(['.', ','])
        .next()
        .filter(|part| !part.is_empty())?;
    integer.parse().ok()
}
