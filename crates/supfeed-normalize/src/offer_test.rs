use supfeed_core::Param;

use super::*;
use crate::validate::{validate, ValidationRules};

fn make_offer() -> CanonicalOffer {
    CanonicalOffer {
        id: "AS100200".to_string(),
        available: true,
        name: "Картридж  HP 85A\u{200B}".to_string(),
        raw_price: Some(41_300),
        pictures: vec![
            "https://cdn.example.kz/p/100200.jpg".to_string(),
            " https://cdn.example.kz/p/100200.jpg ".to_string(),
            "https://cdn.example.kz/p/100200 back.jpg".to_string(),
        ],
        vendor: String::new(),
        attributes: vec![
            Param::new("Штрихкод", "4600000000000"),
            Param::new("Цвет", "черный"),
            Param::new("Ресурс", "1600 стр."),
        ],
        native_description: "<p>Оригинальный картридж.</p>".to_string(),
    }
}

fn pipeline() -> Pipeline {
    Pipeline {
        template: DescriptionTemplate {
            contact_block: "<p>C</p>".to_string(),
            terms_block: "<p>T</p>".to_string(),
        },
        keywords: KeywordConfig {
            cities: vec!["Алматы".to_string()],
            ..KeywordConfig::default()
        },
        ..Pipeline::default()
    }
}

#[test]
fn normalize_applies_every_stage() {
    let out = normalize_offer(&make_offer(), &pipeline());

    assert_eq!(out.id, "AS100200");
    assert_eq!(out.vendor_code, out.id);
    assert_eq!(out.name, "Картридж HP 85A");
    assert_eq!(out.price, 48_900);
    assert_eq!(
        out.pictures,
        vec![
            "https://cdn.example.kz/p/100200.jpg".to_string(),
            "https://cdn.example.kz/p/100200%20back.jpg".to_string(),
        ]
    );
    assert_eq!(out.vendor, "HP");
    assert_eq!(out.currency, "KZT");
    assert_eq!(
        out.params,
        vec![Param::new("Ресурс", "1600 стр."), Param::new("Цвет", "черный")]
    );
    assert_eq!(
        out.keywords,
        "HP, Картридж HP 85A, Картридж, 85A, Алматы"
    );
}

#[test]
fn missing_pictures_fall_back_to_single_placeholder() {
    let mut offer = make_offer();
    offer.pictures = vec![];
    let out = normalize_offer(&offer, &pipeline());
    assert_eq!(
        out.pictures,
        vec!["https://placehold.co/800x800/png?text=No+Photo".to_string()]
    );

    let block = render_offer(&out, OutputEncoding::Utf8);
    assert_eq!(block.matches("<picture>").count(), 1);
    assert!(block.contains("<picture>https://placehold.co/800x800/png?text=No+Photo</picture>"));
}

#[test]
fn denied_param_never_reaches_params_or_description() {
    let out = normalize_offer(&make_offer(), &pipeline());
    assert!(out.params.iter().all(|p| p.name != "Штрихкод"));
    assert!(!out.description.contains("Штрихкод"));
    assert!(!render_offer(&out, OutputEncoding::Utf8).contains("Штрихкод"));
}

#[test]
fn empty_native_description_still_renders_template() {
    let mut offer = make_offer();
    offer.native_description = String::new();
    let out = normalize_offer(&offer, &pipeline());
    assert!(out.description.starts_with("<p>C</p><hr><h3>Картридж HP 85A</h3><p></p>"));
    assert!(out.description.ends_with("<p>T</p>"));
}

#[test]
fn vendor_override_beats_supplied_and_detected_vendor() {
    let mut offer = make_offer();
    offer.vendor = "Hewlett".to_string();
    let pipeline = Pipeline {
        vendor_override: Some("CopyLine".to_string()),
        ..pipeline()
    };
    let out = normalize_offer(&offer, &pipeline);
    assert_eq!(out.vendor, "CopyLine");
    assert!(out.keywords.starts_with("CopyLine, "));
}

#[test]
fn unknown_price_becomes_sentinel() {
    let mut offer = make_offer();
    offer.raw_price = None;
    assert_eq!(normalize_offer(&offer, &pipeline()).price, 100);
}

#[test]
fn render_matches_feed_layout() {
    let offer = OutputOffer {
        id: "CL77".to_string(),
        available: false,
        vendor_code: "CL77".to_string(),
        name: "Бумага \"Снегурочка\" A4".to_string(),
        price: 3_900,
        pictures: vec!["https://cdn.example.kz/a.jpg?w=1&h=2".to_string()],
        vendor: "Mondi".to_string(),
        currency: "KZT".to_string(),
        description: "<p>x</p>".to_string(),
        params: vec![Param::new("Формат", "A4 <210x297>")],
        keywords: "Mondi, Бумага".to_string(),
    };
    let expected = "<offer id=\"CL77\" available=\"false\">\n\
<categoryId></categoryId>\n\
<vendorCode>CL77</vendorCode>\n\
<name>Бумага &quot;Снегурочка&quot; A4</name>\n\
<price>3900</price>\n\
<picture>https://cdn.example.kz/a.jpg?w=1&amp;h=2</picture>\n\
<vendor>Mondi</vendor>\n\
<currencyId>KZT</currencyId>\n\
<description><![CDATA[<p>x</p>]]></description>\n\
<param name=\"Формат\">A4 &lt;210x297&gt;</param>\n\
<keywords>Mondi, Бумага</keywords>\n\
</offer>";
    assert_eq!(render_offer(&offer, OutputEncoding::Utf8), expected);
}

#[test]
fn render_replaces_characters_outside_target_encoding() {
    let mut out = normalize_offer(&make_offer(), &pipeline());
    out.name = "Кабель ≥ 2 м 😀".to_string();
    let block = render_offer(&out, OutputEncoding::Windows1251);
    assert!(block.contains("<name>Кабель &#8805; 2 м &#128512;</name>"));
    assert_eq!(
        OutputEncoding::Windows1251.decode(&OutputEncoding::Windows1251.encode(&block)),
        block
    );
}

#[test]
fn render_splits_cdata_terminator_in_description() {
    let mut out = normalize_offer(&make_offer(), &pipeline());
    out.description = "a]]>b".to_string();
    let block = render_offer(&out, OutputEncoding::Utf8);
    assert!(block.contains("<description><![CDATA[a]]]]><![CDATA[>b]]></description>"));
}

#[test]
fn rendered_offer_passes_validation() {
    let out = normalize_offer(&make_offer(), &pipeline());
    let feed = format!(
        "<yml_catalog><shop><offers>\n{}\n</offers></shop></yml_catalog>",
        render_offer(&out, OutputEncoding::Utf8)
    );
    let stats = validate(&feed, &ValidationRules::default()).expect("valid feed");
    assert_eq!(stats.offers, 1);
    assert_eq!(stats.available, 1);
}

#[test]
fn for_supplier_carries_supplier_settings() {
    let supplier = make_supplier();
    let config = supfeed_core::AppConfig {
        env: supfeed_core::Environment::Test,
        log_level: "info".to_string(),
        suppliers_path: "config/suppliers.yaml".into(),
        output_dir: "docs".into(),
        output_encoding: OutputEncoding::Windows1251,
        http_timeout_secs: 30,
        user_agent: "test".to_string(),
        max_retries: 0,
        retry_delay_secs: 0,
        max_concurrent_suppliers: 1,
        tz_offset_hours: 5,
        currency: "RUB".to_string(),
        placeholder_picture: "https://example.kz/none.png".to_string(),
        default_vendor: "House".to_string(),
        validation_sample_size: 10,
    };
    let pipeline = Pipeline::for_supplier(&config, &supplier);
    assert_eq!(pipeline.currency, "RUB");
    assert_eq!(pipeline.default_vendor, "House");
    assert_eq!(pipeline.vendor_override.as_deref(), Some("CopyLine"));
    assert!(pipeline.params.is_denied("код товара поставщика"));
    assert_eq!(pipeline.priority_params, vec!["Тип".to_string()]);
    assert_eq!(pipeline.pricing.percent, 4);
}

fn make_supplier() -> SupplierConfig {
    SupplierConfig {
        name: "CopyLine".to_string(),
        url: "https://copyline.example.kz/feed.xml".to_string(),
        id_prefix: "CL".to_string(),
        output_file: None,
        enabled: true,
        build_hour: 1,
        price_field: "price".to_string(),
        login_env: None,
        password_env: None,
        category_allow: vec![],
        category_deny: vec![],
        vendor_override: Some(" CopyLine ".to_string()),
        drop_params: vec!["Код товара поставщика".to_string()],
        priority_params: vec!["Тип".to_string()],
        extra_keywords: vec![],
        pricing: None,
    }
}
