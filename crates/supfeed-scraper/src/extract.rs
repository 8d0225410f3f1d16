//! Generic extractor for YML-shaped supplier catalogs.
//!
//! Walks `<offer>` elements with a streaming `quick-xml` reader and turns
//! each into a [`CanonicalOffer`]. Everything supplier-specific (price
//! element, category filters, id prefix) comes from [`SupplierConfig`].

use std::borrow::Cow;
use std::collections::HashSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Url;
use supfeed_core::{CanonicalOffer, Param, SupplierConfig};
use supfeed_normalize::parse_raw_price;

use crate::error::ScraperError;

/// Offers pulled out of one catalog plus what happened to the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractOutcome {
    pub offers: Vec<CanonicalOffer>,
    /// `<offer>` elements in the catalog, before any filtering.
    pub before: usize,
    /// Dropped by the supplier's category allow/deny lists.
    pub filtered: usize,
    /// Dropped for lacking a usable code or a name.
    pub invalid: usize,
    /// Dropped because an earlier offer already produced the same id.
    pub duplicates: usize,
}

impl ExtractOutcome {
    #[must_use]
    pub fn after(&self) -> usize {
        self.offers.len()
    }
}

/// Fields of one `<offer>` as read, before validation.
#[derive(Debug, Default)]
struct RawOffer {
    code: String,
    vendor_code: String,
    available: Option<bool>,
    name: String,
    vendor: String,
    description: String,
    price: Option<String>,
    categories: Vec<String>,
    pictures: Vec<String>,
    params: Vec<Param>,
}

/// A direct child of `<offer>` whose text is being collected.
#[derive(Debug)]
struct OpenField {
    tag: String,
    param_name: Option<String>,
    text: String,
    /// Elements nested inside the field, e.g. unescaped HTML in a description.
    depth: usize,
}

impl OpenField {
    fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);
    }
}

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key.as_bytes())
        .map(|a| {
            a.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&a.value).into_owned(),
                Cow::into_owned,
            )
        })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "да" => Some(true),
        "false" | "0" | "no" | "нет" => Some(false),
        _ => None,
    }
}

impl RawOffer {
    fn open(element: &BytesStart<'_>) -> Self {
        Self {
            code: attribute(element, "id").unwrap_or_default(),
            available: attribute(element, "available").as_deref().and_then(parse_flag),
            ..Self::default()
        }
    }

    fn commit(&mut self, field: OpenField, price_field: &str) {
        let text = field.text.trim().to_owned();
        match field.tag.as_str() {
            tag if tag == price_field => self.price = Some(text),
            "name" => self.name = text,
            "vendor" => self.vendor = text,
            "vendorCode" => self.vendor_code = text,
            "description" => self.description = text,
            "categoryId" => self.categories.push(text),
            "picture" => self.pictures.push(text),
            "available" => {
                if let Some(flag) = parse_flag(&text) {
                    self.available = Some(flag);
                }
            }
            "param" => {
                if let Some(name) = field.param_name {
                    self.params.push(Param::new(name.trim(), text));
                }
            }
            _ => {}
        }
    }
}

fn category_allowed(categories: &[String], supplier: &SupplierConfig) -> bool {
    if categories.iter().any(|c| supplier.category_deny.contains(c)) {
        return false;
    }
    supplier.category_allow.is_empty()
        || categories.iter().any(|c| supplier.category_allow.contains(c))
}

/// Keeps only `[A-Za-z0-9_-]` so ids stay safe in attributes and file names.
fn sanitize_code(code: &str) -> String {
    code.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-'))
        .collect()
}

fn resolve_picture(raw: &str, base: Option<&Url>) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    resolved.ok().map(String::from)
}

struct Extractor<'a> {
    supplier: &'a SupplierConfig,
    base: Option<Url>,
    seen: HashSet<String>,
    outcome: ExtractOutcome,
}

impl Extractor<'_> {
    fn finish(&mut self, raw: RawOffer) {
        self.outcome.before += 1;

        if !category_allowed(&raw.categories, self.supplier) {
            self.outcome.filtered += 1;
            return;
        }

        let native = if raw.code.trim().is_empty() {
            &raw.vendor_code
        } else {
            &raw.code
        };
        let code = sanitize_code(native);
        let name = raw.name.trim();
        if code.is_empty() || name.is_empty() {
            tracing::debug!(
                supplier = %self.supplier.name,
                code = %native,
                name,
                "dropping catalog record without code or name"
            );
            self.outcome.invalid += 1;
            return;
        }

        let id = format!("{}{code}", self.supplier.id_prefix);
        if !self.seen.insert(id.clone()) {
            tracing::debug!(
                supplier = %self.supplier.name,
                id = %id,
                "dropping repeated catalog record"
            );
            self.outcome.duplicates += 1;
            return;
        }

        let mut pictures: Vec<String> = Vec::with_capacity(raw.pictures.len());
        for picture in raw
            .pictures
            .iter()
            .filter_map(|p| resolve_picture(p, self.base.as_ref()))
        {
            if !pictures.contains(&picture) {
                pictures.push(picture);
            }
        }

        self.outcome.offers.push(CanonicalOffer {
            id,
            available: raw.available.unwrap_or(true),
            name: name.to_owned(),
            raw_price: raw.price.as_deref().and_then(parse_raw_price),
            pictures,
            vendor: raw.vendor.trim().to_owned(),
            attributes: raw.params,
            native_description: raw.description,
        });
    }
}

/// Extracts canonical offers from a decoded supplier catalog.
///
/// The id of each offer is the supplier's `id_prefix` followed by the
/// sanitized `id` attribute (or `<vendorCode>` when the attribute is empty).
/// The dealer price is read from the element named by `price_field`.
/// Relative picture URLs are resolved against the supplier URL.
///
/// # Errors
///
/// Returns [`ScraperError::Xml`] if the document is not well-formed.
pub fn extract_offers(
    xml: &str,
    supplier: &SupplierConfig,
) -> Result<ExtractOutcome, ScraperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut extractor = Extractor {
        supplier,
        base: Url::parse(&supplier.url).ok(),
        seen: HashSet::new(),
        outcome: ExtractOutcome::default(),
    };
    let mut current: Option<RawOffer> = None;
    let mut field: Option<OpenField> = None;

    loop {
        let event = reader.read_event().map_err(|source| ScraperError::Xml {
            position: reader.error_position(),
            source,
        })?;

        match event {
            Event::Start(e) => {
                let name = local_name(e.local_name().as_ref());
                if let Some(open) = field.as_mut() {
                    open.depth += 1;
                } else if current.is_some() {
                    field = Some(OpenField {
                        param_name: (name == "param")
                            .then(|| attribute(&e, "name"))
                            .flatten(),
                        tag: name,
                        text: String::new(),
                        depth: 0,
                    });
                } else if name == "offer" {
                    current = Some(RawOffer::open(&e));
                }
            }
            Event::Empty(e) => {
                if current.is_none() && e.local_name().as_ref() == b"offer" {
                    extractor.finish(RawOffer::open(&e));
                }
            }
            Event::Text(e) => {
                if let Some(open) = field.as_mut() {
                    let text = e.unescape().map_or_else(
                        |_| String::from_utf8_lossy(&e).into_owned(),
                        Cow::into_owned,
                    );
                    open.push(&text);
                }
            }
            Event::CData(e) => {
                if let Some(open) = field.as_mut() {
                    open.push(&String::from_utf8_lossy(&e));
                }
            }
            Event::End(e) => match field.take() {
                Some(mut open) if open.depth > 0 => {
                    open.depth -= 1;
                    field = Some(open);
                }
                Some(closed) => {
                    if let Some(offer) = current.as_mut() {
                        offer.commit(closed, &supplier.price_field);
                    }
                }
                None => {
                    if e.local_name().as_ref() == b"offer" {
                        if let Some(raw) = current.take() {
                            extractor.finish(raw);
                        }
                    }
                }
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(raw) = current.take() {
        tracing::warn!(supplier = %supplier.name, "catalog ended inside an unterminated offer");
        extractor.finish(raw);
    }

    let outcome = extractor.outcome;
    tracing::info!(
        supplier = %supplier.name,
        before = outcome.before,
        after = outcome.after(),
        filtered = outcome.filtered,
        invalid = outcome.invalid,
        duplicates = outcome.duplicates,
        "catalog extracted"
    );
    Ok(outcome)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
