//! `build` command handler.
//!
//! Supplier failures are logged and reported rather than propagated, so one
//! broken catalog never blocks the others. The previous feed file of a failed
//! supplier stays in place. The command exits non-zero if any supplier failed.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use supfeed_core::{AppConfig, SupplierConfig, SuppliersFile};
use supfeed_feed::{assemble, feed_offset, write_if_changed, FeedCounts, FeedHeader};
use supfeed_normalize::{
    normalize_offer, render_offer, validate, FeedStats, ParamPolicy, Pipeline, ValidationError,
    ValidationRules,
};
use supfeed_scraper::{extract_offers, ExtractOutcome, FeedClient};

#[derive(Debug, Clone, Default)]
pub(crate) struct BuildOptions {
    pub supplier: Option<String>,
    pub dry_run: bool,
    pub allow_empty: bool,
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum BuildStatus {
    Written,
    Unchanged,
    DryRun,
    Failed,
}

impl fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStatus::Written => write!(f, "written"),
            BuildStatus::Unchanged => write!(f, "unchanged"),
            BuildStatus::DryRun => write!(f, "dry-run"),
            BuildStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SupplierReport {
    pub supplier: String,
    pub status: BuildStatus,
    pub path: PathBuf,
    pub offers_before: usize,
    pub offers_after: usize,
    pub available: usize,
    pub unavailable: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A feed that passed validation and is ready to be written.
#[derive(Debug)]
pub(crate) struct RenderedFeed {
    pub feed: String,
    pub counts: FeedCounts,
    pub stats: FeedStats,
}

/// Validation rules for one supplier: the shared ones plus its extra
/// dropped attribute names.
pub(crate) fn rules_for(config: &AppConfig, supplier: &SupplierConfig) -> ValidationRules {
    ValidationRules {
        deny: ParamPolicy::default().with_extra(&supplier.drop_params),
        ..ValidationRules::default()
    }
    .with_sample_size(config.validation_sample_size)
}

/// Normalizes extracted offers and assembles the supplier's feed document.
///
/// # Errors
///
/// Returns the aggregated [`ValidationError`] if the assembled feed breaks
/// any feed invariant; nothing should be written in that case.
pub(crate) fn render_feed(
    config: &AppConfig,
    supplier: &SupplierConfig,
    extracted: &ExtractOutcome,
    built_at: DateTime<FixedOffset>,
) -> Result<RenderedFeed, ValidationError> {
    let pipeline = Pipeline::for_supplier(config, supplier);
    let blocks: Vec<String> = extracted
        .offers
        .iter()
        .map(|offer| render_offer(&normalize_offer(offer, &pipeline), config.output_encoding))
        .collect();

    let available = extracted.offers.iter().filter(|o| o.available).count();
    let counts = FeedCounts {
        before: extracted.before,
        after: blocks.len(),
        available,
        unavailable: blocks.len() - available,
    };

    let header = FeedHeader::new(&supplier.name, &supplier.url, built_at, supplier.build_hour);
    let feed = assemble(&header, &counts, &blocks, config.output_encoding);
    let stats = validate(&feed, &rules_for(config, supplier))?;

    Ok(RenderedFeed {
        feed,
        counts,
        stats,
    })
}

/// Suppliers to build: the one named by `filter` (even if disabled), or
/// every enabled supplier in file order.
pub(crate) fn select_suppliers<'a>(
    suppliers: &'a SuppliersFile,
    filter: Option<&str>,
) -> anyhow::Result<Vec<&'a SupplierConfig>> {
    match filter {
        Some(slug) => {
            let supplier = suppliers
                .find(slug)
                .ok_or_else(|| anyhow::anyhow!("supplier '{slug}' not found"))?;
            if !supplier.enabled {
                tracing::info!(supplier = %slug, "building disabled supplier on explicit request");
            }
            Ok(vec![supplier])
        }
        None => Ok(suppliers.enabled().collect()),
    }
}

async fn process_supplier(
    client: &FeedClient,
    config: &AppConfig,
    supplier: &SupplierConfig,
    options: &BuildOptions,
    built_at: DateTime<FixedOffset>,
    path: PathBuf,
) -> anyhow::Result<SupplierReport> {
    let slug = supplier.slug();
    for (low, high) in supplier.pricing_table().gaps() {
        tracing::warn!(supplier = %slug, low, high, "pricing table gap; default add-on applies");
    }

    let body = client.fetch_supplier(supplier).await?;
    let extracted = extract_offers(&body, supplier)?;

    if extracted.offers.is_empty() && !options.allow_empty {
        anyhow::bail!(
            "catalog yielded no offers ({} records before filters); previous feed kept",
            extracted.before
        );
    }

    let rendered = render_feed(config, supplier, &extracted, built_at)?;

    let status = if options.dry_run {
        BuildStatus::DryRun
    } else if write_if_changed(&path, &rendered.feed, config.output_encoding)? {
        BuildStatus::Written
    } else {
        BuildStatus::Unchanged
    };

    tracing::info!(
        supplier = %slug,
        %status,
        offers = rendered.stats.offers,
        available = rendered.stats.available,
        "supplier feed built"
    );

    Ok(SupplierReport {
        supplier: slug,
        status,
        path,
        offers_before: rendered.counts.before,
        offers_after: rendered.counts.after,
        available: rendered.counts.available,
        unavailable: rendered.counts.unavailable,
        error: None,
    })
}

async fn build_supplier(
    client: &FeedClient,
    config: &AppConfig,
    supplier: &SupplierConfig,
    options: &BuildOptions,
    built_at: DateTime<FixedOffset>,
) -> SupplierReport {
    let path = config.output_dir.join(supplier.output_file_name());
    match process_supplier(client, config, supplier, options, built_at, path.clone()).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(supplier = %supplier.slug(), error = %e, "supplier build failed");
            SupplierReport {
                supplier: supplier.slug(),
                status: BuildStatus::Failed,
                path,
                offers_before: 0,
                offers_after: 0,
                available: 0,
                unavailable: 0,
                error: Some(format!("{e:#}")),
            }
        }
    }
}

fn print_reports(reports: &[SupplierReport], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }

    for r in reports {
        match &r.error {
            Some(error) => eprintln!("{:<16} {:<10} {error}", r.supplier, r.status),
            None => println!(
                "{:<16} {:<10} {} of {} offers ({} available) -> {}",
                r.supplier,
                r.status,
                r.offers_after,
                r.offers_before,
                r.available,
                r.path.display()
            ),
        }
    }
    Ok(())
}

/// Builds every selected supplier feed, up to `max_concurrent_suppliers` at
/// a time.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded, the supplier filter
/// matches nothing, or at least one supplier failed.
pub(crate) async fn run_build(config: &AppConfig, options: &BuildOptions) -> anyhow::Result<()> {
    let suppliers_file = supfeed_core::load_suppliers(&config.suppliers_path)?;
    let suppliers = select_suppliers(&suppliers_file, options.supplier.as_deref())?;

    if suppliers.is_empty() {
        println!("no enabled suppliers in {}", config.suppliers_path.display());
        return Ok(());
    }

    let client = FeedClient::from_config(config)?;
    let built_at = Utc::now().with_timezone(&feed_offset(config.tz_offset_hours)?);
    let max_concurrent = config.max_concurrent_suppliers.max(1);

    let mut indexed: Vec<(usize, SupplierReport)> = stream::iter(suppliers.iter().enumerate())
        .map(|(i, supplier)| {
            let fut = build_supplier(&client, config, supplier, options, built_at);
            async move { (i, fut.await) }
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;
    indexed.sort_by_key(|(i, _)| *i);
    let reports: Vec<SupplierReport> = indexed.into_iter().map(|(_, r)| r).collect();

    print_reports(&reports, options.json)?;

    let failed = reports
        .iter()
        .filter(|r| r.status == BuildStatus::Failed)
        .count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} suppliers failed", reports.len());
    }
    Ok(())
}

#[cfg(test)]
#[path = "build_test.rs"]
mod tests;
