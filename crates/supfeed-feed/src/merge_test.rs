use chrono::{FixedOffset, TimeZone};
use supfeed_core::{CanonicalOffer, Param};
use supfeed_normalize::{normalize_offer, render_offer, Pipeline, ViolationKind};

use super::*;

fn header(name: &str) -> FeedHeader {
    let offset = FixedOffset::east_opt(5 * 3600).unwrap();
    let built = offset.with_ymd_and_hms(2026, 3, 14, 2, 0, 0).unwrap();
    FeedHeader::new(name, "https://supplier.example.kz/feed.xml", built, 1)
}

fn block(id: &str, name: &str, available: bool) -> String {
    let offer = CanonicalOffer {
        id: id.to_string(),
        available,
        name: name.to_string(),
        raw_price: Some(10_000),
        pictures: vec![],
        vendor: "Canon".to_string(),
        attributes: vec![Param::new("Цвет", "черный")],
        native_description: String::new(),
    };
    render_offer(&normalize_offer(&offer, &Pipeline::default()), OutputEncoding::Utf8)
}

fn supplier_feed(name: &str, before: usize, blocks: &[String]) -> String {
    let available = blocks.iter().filter(|b| b.contains("available=\"true\"")).count();
    let counts = FeedCounts {
        before,
        after: blocks.len(),
        available,
        unavailable: blocks.len() - available,
    };
    assemble(&header(name), &counts, blocks, OutputEncoding::Utf8)
}

#[test]
fn offer_blocks_skip_cdata_content() {
    let feed = "<offers>\n<offer id=\"A\">\n<description><![CDATA[x </offer> y]]></description>\n</offer>\n\
<offer id=\"B\">\n</offer>\n<offer id=\"C\">\n";
    let blocks = offer_blocks(feed);
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].ends_with("]]></description>\n</offer>"));
    assert_eq!(blocks[1], "<offer id=\"B\">\n</offer>");
}

#[test]
fn merge_keeps_first_offer_per_id_and_recounts() {
    let a = supplier_feed(
        "AlStyle",
        10,
        &[block("AS1", "Первый", true), block("X1", "Общий A", true)],
    );
    let b = supplier_feed(
        "Akcent",
        7,
        &[block("X1", "Общий B", false), block("AC1", "Второй", false)],
    );

    let outcome = merge(
        &[a, b],
        &header("Merged"),
        &ValidationRules::default(),
        OutputEncoding::Utf8,
    )
    .unwrap();

    assert_eq!(outcome.duplicates, 1);
    assert_eq!(outcome.stats.offers, 3);
    assert_eq!(outcome.stats.available, 2);
    assert!(outcome.feed.contains("<name>Общий A</name>"));
    assert!(!outcome.feed.contains("<name>Общий B</name>"));
    assert_eq!(
        parse_counts(&outcome.feed),
        Some(FeedCounts {
            before: 17,
            after: 3,
            available: 2,
            unavailable: 1,
        })
    );
    let order: Vec<_> = offer_blocks(&outcome.feed)
        .iter()
        .filter_map(|b| offer_id(b))
        .collect();
    assert_eq!(order, vec!["AS1", "X1", "AC1"]);
}

#[test]
fn merge_without_meta_counts_offers_as_before() {
    let bare = format!("<offers>\n{}\n</offers>", block("AS1", "Товар", true));
    let outcome = merge(
        &[bare],
        &header("Merged"),
        &ValidationRules::default(),
        OutputEncoding::Utf8,
    )
    .unwrap();
    assert_eq!(parse_counts(&outcome.feed).map(|c| c.before), Some(1));
}

#[test]
fn merge_revalidates_result() {
    let broken = block("AS1", "Товар", true).replace("<price>", "<price>-");
    let feed = supplier_feed("AlStyle", 1, &[broken]);
    let err = merge(
        &[feed],
        &header("Merged"),
        &ValidationRules::default(),
        OutputEncoding::Utf8,
    )
    .unwrap_err();
    match err {
        FeedError::Validation(v) => assert!(v.has(ViolationKind::PriceOutOfBounds)),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn merge_of_nothing_is_an_error() {
    let err = merge(
        &[],
        &header("Merged"),
        &ValidationRules::default(),
        OutputEncoding::Utf8,
    )
    .unwrap_err();
    assert!(matches!(err, FeedError::NoInputs));
}
