//! Handlers for commands that work on feed files already on disk.

use std::path::{Path, PathBuf};

use chrono::Utc;
use supfeed_core::{AppConfig, PricingTable};
use supfeed_feed::{feed_offset, merge, read_feed, write_if_changed, FeedHeader};
use supfeed_normalize::{compute_price, parse_raw_price, ValidationRules};

fn shared_rules(config: &AppConfig) -> ValidationRules {
    ValidationRules::default().with_sample_size(config.validation_sample_size)
}

/// Validates a feed file and prints its offer counts.
///
/// # Errors
///
/// Returns an error if the file cannot be read or breaks a feed invariant.
pub(crate) fn run_validate(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let feed = read_feed(file, config.output_encoding)?;
    let stats = supfeed_normalize::validate(&feed, &shared_rules(config))?;
    println!(
        "{}: ok, {} offers ({} available, {} unavailable)",
        file.display(),
        stats.offers,
        stats.available,
        stats.unavailable
    );
    Ok(())
}

/// Merges `inputs` into `output`.
///
/// # Errors
///
/// Returns an error if an input cannot be read, the merged feed fails
/// validation, or the output cannot be written.
pub(crate) fn run_merge(
    config: &AppConfig,
    inputs: &[PathBuf],
    output: &Path,
    name: &str,
    build_hour: u8,
) -> anyhow::Result<()> {
    if build_hour > 23 {
        anyhow::bail!("build hour must be below 24, got {build_hour}");
    }

    let feeds = inputs
        .iter()
        .map(|path| read_feed(path, config.output_encoding))
        .collect::<Result<Vec<_>, _>>()?;

    let sources = inputs
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(", ");
    let built_at = Utc::now().with_timezone(&feed_offset(config.tz_offset_hours)?);
    let header = FeedHeader::new(name, sources, built_at, build_hour);

    let outcome = merge(&feeds, &header, &shared_rules(config), config.output_encoding)?;
    let written = write_if_changed(output, &outcome.feed, config.output_encoding)?;

    println!(
        "{}: {} offers from {} feeds, {} duplicates dropped{}",
        output.display(),
        outcome.stats.offers,
        inputs.len(),
        outcome.duplicates,
        if written { "" } else { " (unchanged)" }
    );
    Ok(())
}

/// Pricing table for the `price` command: the supplier's when `supplier`
/// names one, otherwise the shared default.
fn pricing_for(config: &AppConfig, supplier: Option<&str>) -> anyhow::Result<PricingTable> {
    let Some(slug) = supplier else {
        return Ok(PricingTable::default());
    };
    let suppliers = supfeed_core::load_suppliers(&config.suppliers_path)?;
    let supplier = suppliers
        .find(slug)
        .ok_or_else(|| anyhow::anyhow!("supplier '{slug}' not found"))?;
    Ok(supplier.pricing_table())
}

/// Prints the retail price for a raw dealer price string.
///
/// # Errors
///
/// Returns an error if a named supplier cannot be loaded.
pub(crate) fn run_price(config: &AppConfig, raw: &str, supplier: Option<&str>) -> anyhow::Result<()> {
    let table = pricing_for(config, supplier)?;
    let parsed = parse_raw_price(raw);
    if parsed.is_none() {
        tracing::warn!(raw, "raw price is not a number; sentinel price applies");
    }
    println!("{}", compute_price(parsed, &table));
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use supfeed_feed::{assemble, FeedCounts};

    use super::*;
    use crate::test_support::test_config;

    fn empty_feed(supplier: &str, before: usize) -> String {
        let built = feed_offset(5)
            .unwrap()
            .with_ymd_and_hms(2026, 3, 14, 1, 0, 0)
            .unwrap();
        let header = FeedHeader::new(supplier, "https://supplier.example.kz/catalog.xml", built, 1);
        let counts = FeedCounts {
            before,
            ..FeedCounts::default()
        };
        assemble(&header, &counts, &[], supfeed_core::OutputEncoding::Windows1251)
    }

    fn write_feed(dir: &Path, name: &str, feed: &str) -> PathBuf {
        let path = dir.join(name);
        write_if_changed(&path, feed, supfeed_core::OutputEncoding::Windows1251).unwrap();
        path
    }

    #[test]
    fn validate_accepts_clean_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_feed(dir.path(), "alstyle.yml", &empty_feed("AlStyle", 0));
        run_validate(&test_config(), &path).unwrap();
    }

    #[test]
    fn validate_rejects_broken_feed() {
        let dir = tempfile::tempdir().unwrap();
        let broken = empty_feed("AlStyle", 0).replace(
            "</offers>",
            "<offer id=\"A1\" available=\"true\">\n<available>true</available>\n</offer>\n</offers>",
        );
        let path = write_feed(dir.path(), "broken.yml", &broken);
        let err = run_validate(&test_config(), &path).unwrap_err();
        assert!(err.to_string().contains("feed validation failed"), "got: {err}");
    }

    #[test]
    fn validate_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run_validate(&test_config(), &dir.path().join("nope.yml")).is_err());
    }

    #[test]
    fn merge_writes_combined_feed() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_feed(dir.path(), "alstyle.yml", &empty_feed("AlStyle", 4));
        let b = write_feed(dir.path(), "akcent.yml", &empty_feed("Akcent", 3));
        let output = dir.path().join("out").join("all.yml");

        run_merge(&test_config(), &[a, b], &output, "Combined", 1).unwrap();

        let merged = read_feed(&output, supfeed_core::OutputEncoding::Windows1251).unwrap();
        assert!(merged.contains("Supplier URL             | alstyle.yml, akcent.yml"));
        assert!(merged.contains("Offers before filter     | 7"));
    }

    #[test]
    fn merge_rejects_bad_build_hour() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_feed(dir.path(), "alstyle.yml", &empty_feed("AlStyle", 0));
        let err = run_merge(&test_config(), &[a], &dir.path().join("all.yml"), "Combined", 24)
            .unwrap_err();
        assert!(err.to_string().contains("below 24"));
    }

    #[test]
    fn price_uses_shared_table_without_supplier() {
        run_price(&test_config(), "41 300", None).unwrap();
        assert_eq!(pricing_for(&test_config(), None).unwrap(), PricingTable::default());
    }
}
