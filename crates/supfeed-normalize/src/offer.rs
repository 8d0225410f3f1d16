use std::collections::HashSet;

use supfeed_core::{
    AppConfig, CanonicalOffer, OutputEncoding, OutputOffer, PricingTable, SupplierConfig,
};

use crate::description::{build_description, DescriptionTemplate};
use crate::keywords::{build_keywords, KeywordConfig};
use crate::params::{clean_params, sort_params, ParamPolicy};
use crate::pricing::compute_price;
use crate::text::{
    cdata_safe, collapse_whitespace, html_to_text, normalize_picture_url, strip_zero_width,
    xml_escape,
};
use crate::vendor::{pick_vendor, BrandTable};

/// Everything needed to normalize the offers of one supplier.
///
/// Built once per supplier run; [`normalize_offer`] only reads it.
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub pricing: PricingTable,
    pub params: ParamPolicy,
    pub priority_params: Vec<String>,
    pub template: DescriptionTemplate,
    pub keywords: KeywordConfig,
    pub extra_keywords: Vec<String>,
    pub brands: BrandTable,
    pub default_vendor: String,
    /// Forced onto every offer when set.
    pub vendor_override: Option<String>,
    pub placeholder_picture: String,
    pub currency: String,
}

impl Pipeline {
    #[must_use]
    pub fn for_supplier(config: &AppConfig, supplier: &SupplierConfig) -> Self {
        Self {
            pricing: supplier.pricing_table(),
            params: ParamPolicy::default().with_extra(&supplier.drop_params),
            priority_params: supplier.priority_params.clone(),
            template: DescriptionTemplate::default(),
            keywords: KeywordConfig::default(),
            extra_keywords: supplier.extra_keywords.clone(),
            brands: BrandTable::default(),
            default_vendor: config.default_vendor.clone(),
            vendor_override: supplier
                .vendor_override
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(ToString::to_string),
            placeholder_picture: config.placeholder_picture.clone(),
            currency: config.currency.clone(),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            pricing: PricingTable::default(),
            params: ParamPolicy::default(),
            priority_params: Vec::new(),
            template: DescriptionTemplate::default(),
            keywords: KeywordConfig::default(),
            extra_keywords: Vec::new(),
            brands: BrandTable::default(),
            default_vendor: "NoName".to_string(),
            vendor_override: None,
            placeholder_picture: "https://placehold.co/800x800/png?text=No+Photo".to_string(),
            currency: "KZT".to_string(),
        }
    }
}

fn normalize_pictures(pictures: &[String], placeholder: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out: Vec<String> = pictures
        .iter()
        .map(|url| normalize_picture_url(url))
        .filter(|url| !url.is_empty() && seen.insert(url.clone()))
        .collect();
    if out.is_empty() {
        out.push(normalize_picture_url(placeholder));
    }
    out
}

/// Runs one extracted offer through pricing, parameter cleanup, vendor
/// resolution, and the description and keyword builders.
#[must_use]
pub fn normalize_offer(offer: &CanonicalOffer, pipeline: &Pipeline) -> OutputOffer {
    let name = collapse_whitespace(&strip_zero_width(&offer.name));
    let params = sort_params(
        &clean_params(&offer.attributes, &pipeline.params),
        &pipeline.priority_params,
    );

    let vendor = match &pipeline.vendor_override {
        Some(forced) => forced.clone(),
        None => pick_vendor(
            &offer.vendor,
            &name,
            &html_to_text(&offer.native_description),
            &params,
            &pipeline.brands,
            &pipeline.default_vendor,
        ),
    };

    let description = build_description(
        &name,
        &offer.native_description,
        &params,
        &pipeline.template,
    );
    let keywords = build_keywords(
        &vendor,
        &name,
        &pipeline.extra_keywords,
        &pipeline.keywords,
    );

    OutputOffer {
        id: offer.id.clone(),
        available: offer.available,
        vendor_code: offer.id.clone(),
        name,
        price: compute_price(offer.raw_price, &pipeline.pricing),
        pictures: normalize_pictures(&offer.pictures, &pipeline.placeholder_picture),
        vendor,
        currency: pipeline.currency.clone(),
        description,
        params,
        keywords,
    }
}

/// Serializes an offer into its feed block, without a trailing newline.
///
/// Characters `encoding` cannot hold are written as numeric character
/// references.
#[must_use]
pub fn render_offer(offer: &OutputOffer, encoding: OutputEncoding) -> String {
    let mut lines = Vec::with_capacity(12 + offer.pictures.len() + offer.params.len());

    lines.push(format!(
        r#"<offer id="{}" available="{}">"#,
        xml_escape(&offer.id),
        offer.available
    ));
    lines.push("<categoryId></categoryId>".to_string());
    lines.push(format!(
        "<vendorCode>{}</vendorCode>",
        xml_escape(&offer.vendor_code)
    ));
    lines.push(format!("<name>{}</name>", xml_escape(&offer.name)));
    lines.push(format!("<price>{}</price>", offer.price));
    for picture in &offer.pictures {
        lines.push(format!("<picture>{}</picture>", xml_escape(picture)));
    }
    lines.push(format!("<vendor>{}</vendor>", xml_escape(&offer.vendor)));
    lines.push(format!(
        "<currencyId>{}</currencyId>",
        xml_escape(&offer.currency)
    ));
    lines.push(format!(
        "<description><![CDATA[{}]]></description>",
        cdata_safe(&offer.description)
    ));
    for param in &offer.params {
        lines.push(format!(
            r#"<param name="{}">{}</param>"#,
            xml_escape(&param.name),
            xml_escape(&param.value)
        ));
    }
    lines.push(format!("<keywords>{}</keywords>", xml_escape(&offer.keywords)));
    lines.push("</offer>".to_string());

    encoding.represent(&lines.join("\n")).into_owned()
}

#[cfg(test)]
#[path = "offer_test.rs"]
mod tests;
