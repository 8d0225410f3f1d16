//! Markup tier tables.
//!
//! Every supplier prices with the same shape: a proportional markup, a flat
//! add-on picked from a tier table, and a fixed tail for the last three digits.
//! Suppliers that deviate ship their own table in `suppliers.yaml`; the
//! algorithm itself lives in `supfeed_normalize::pricing`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest raw price that is priced at all. Anything at or below this becomes
/// the sentinel.
pub const MIN_RAW_PRICE: i64 = 101;

/// Prices at or above this bound are never published.
pub const PRICE_CEILING: i64 = 9_000_000;

/// Price emitted when the real price is unknown or suppressed.
pub const SENTINEL_PRICE: i64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PricingError {
    #[error("tier {low}..={high} has low bound above high bound")]
    InvertedTier { low: i64, high: i64 },

    #[error("tiers {first_low}..={first_high} and {second_low}..={second_high} overlap")]
    OverlappingTiers {
        first_low: i64,
        first_high: i64,
        second_low: i64,
        second_high: i64,
    },

    #[error("tail {0} must be below 1000")]
    InvalidTail(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTier {
    pub low: i64,
    pub high: i64,
    pub add_on: i64,
}

impl PricingTier {
    #[must_use]
    pub const fn new(low: i64, high: i64, add_on: i64) -> Self {
        Self { low, high, add_on }
    }

    #[must_use]
    pub fn contains(&self, raw: i64) -> bool {
        (self.low..=self.high).contains(&raw)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingTable {
    /// Proportional markup in whole percent; `0` disables it.
    pub percent: u32,
    /// Last three digits every computed price is rounded up to.
    pub tail: u16,
    /// Add-on used when no tier covers the raw price.
    pub default_add_on: i64,
    pub tiers: Vec<PricingTier>,
}

impl PricingTable {
    /// Builds a table and checks it for inverted or overlapping tiers.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError`] if the table is inconsistent.
    pub fn new(
        percent: u32,
        tail: u16,
        default_add_on: i64,
        tiers: Vec<PricingTier>,
    ) -> Result<Self, PricingError> {
        let table = Self {
            percent,
            tail,
            default_add_on,
            tiers,
        };
        table.validate()?;
        Ok(table)
    }

    /// Checks the table for inverted tiers, overlaps, and an out-of-range tail.
    ///
    /// Gaps are not errors; see [`Self::gaps`].
    ///
    /// # Errors
    ///
    /// Returns the first [`PricingError`] found.
    pub fn validate(&self) -> Result<(), PricingError> {
        if self.tail >= 1000 {
            return Err(PricingError::InvalidTail(self.tail));
        }
        if let Some(t) = self.tiers.iter().find(|t| t.low > t.high) {
            return Err(PricingError::InvertedTier {
                low: t.low,
                high: t.high,
            });
        }
        let sorted = self.sorted_tiers();
        for pair in sorted.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if b.low <= a.high {
                return Err(PricingError::OverlappingTiers {
                    first_low: a.low,
                    first_high: a.high,
                    second_low: b.low,
                    second_high: b.high,
                });
            }
        }
        Ok(())
    }

    /// Returns the raw-price bands between [`MIN_RAW_PRICE`] and the highest
    /// tier that no tier covers. Those bands fall back to `default_add_on`.
    #[must_use]
    pub fn gaps(&self) -> Vec<(i64, i64)> {
        let mut gaps = Vec::new();
        let mut next_uncovered = MIN_RAW_PRICE;
        for tier in self.sorted_tiers() {
            if tier.high < next_uncovered {
                continue;
            }
            if tier.low > next_uncovered {
                gaps.push((next_uncovered, tier.low - 1));
            }
            next_uncovered = tier.high.saturating_add(1);
        }
        gaps
    }

    /// Flat add-on for `raw`: the first tier containing it, else the default.
    #[must_use]
    pub fn add_on_for(&self, raw: i64) -> i64 {
        self.tiers
            .iter()
            .find(|t| t.contains(raw))
            .map_or(self.default_add_on, |t| t.add_on)
    }

    fn sorted_tiers(&self) -> Vec<PricingTier> {
        let mut sorted = self.tiers.clone();
        sorted.sort_by_key(|t| t.low);
        sorted
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            percent: 4,
            tail: 900,
            default_add_on: 60_000,
            tiers: vec![
                PricingTier::new(101, 10_000, 3_000),
                PricingTier::new(10_001, 25_000, 4_000),
                PricingTier::new(25_001, 50_000, 5_000),
                PricingTier::new(50_001, 75_000, 7_000),
                PricingTier::new(75_001, 100_000, 10_000),
                PricingTier::new(100_001, 150_000, 12_000),
                PricingTier::new(150_001, 200_000, 15_000),
                PricingTier::new(200_001, 300_000, 20_000),
                PricingTier::new(300_001, 400_000, 25_000),
                PricingTier::new(400_001, 500_000, 30_000),
                PricingTier::new(500_001, 750_000, 40_000),
                PricingTier::new(750_001, 1_000_000, 45_000),
                PricingTier::new(1_000_001, 1_500_000, 50_000),
                PricingTier::new(1_500_001, 2_000_000, 55_000),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid_and_gapless() {
        let table = PricingTable::default();
        assert!(table.validate().is_ok());
        assert!(table.gaps().is_empty());
    }

    #[test]
    fn add_on_for_picks_matching_tier() {
        let table = PricingTable::default();
        assert_eq!(table.add_on_for(101), 3_000);
        assert_eq!(table.add_on_for(10_000), 3_000);
        assert_eq!(table.add_on_for(10_001), 4_000);
        assert_eq!(table.add_on_for(41_300), 5_000);
        assert_eq!(table.add_on_for(2_000_000), 55_000);
    }

    #[test]
    fn add_on_for_uses_default_above_last_tier() {
        let table = PricingTable::default();
        assert_eq!(table.add_on_for(2_000_001), 60_000);
    }

    #[test]
    fn new_rejects_inverted_tier() {
        let err = PricingTable::new(4, 900, 0, vec![PricingTier::new(500, 100, 1)]).unwrap_err();
        assert_eq!(err, PricingError::InvertedTier { low: 500, high: 100 });
    }

    #[test]
    fn new_rejects_overlapping_tiers() {
        let err = PricingTable::new(
            4,
            900,
            0,
            vec![
                PricingTier::new(101, 5_000, 1),
                PricingTier::new(5_000, 9_000, 2),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, PricingError::OverlappingTiers { second_low: 5_000, .. }));
    }

    #[test]
    fn new_rejects_tail_of_four_digits() {
        let err = PricingTable::new(4, 1000, 0, vec![]).unwrap_err();
        assert_eq!(err, PricingError::InvalidTail(1000));
    }

    #[test]
    fn gaps_reports_uncovered_bands() {
        let table = PricingTable::new(
            0,
            900,
            1_000,
            vec![
                PricingTier::new(1_001, 5_000, 1),
                PricingTier::new(8_001, 9_000, 2),
            ],
        )
        .unwrap();
        assert_eq!(table.gaps(), vec![(101, 1_000), (5_001, 8_000)]);
    }

    #[test]
    fn gaps_ignores_unsorted_tier_order() {
        let table = PricingTable::new(
            0,
            900,
            1_000,
            vec![
                PricingTier::new(201, 300, 1),
                PricingTier::new(101, 200, 1),
            ],
        )
        .unwrap();
        assert!(table.gaps().is_empty());
    }
}
