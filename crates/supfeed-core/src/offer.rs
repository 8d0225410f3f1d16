use serde::{Deserialize, Serialize};

/// A single supplier-defined attribute, e.g. `("Цвет", "чёрный")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub value: String,
}

impl Param {
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A product as handed over by an extractor, before any normalization.
///
/// Extractors drop records without an id or a name, so every field here is
/// assumed present and well-typed; only `raw_price` may legitimately be absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalOffer {
    /// Supplier prefix plus the supplier-native product code, e.g. `"AS12345"`.
    /// Stable across re-fetches; never derived from content.
    pub id: String,
    pub available: bool,
    pub name: String,
    /// Dealer price in whole currency units, exactly as the supplier sent it.
    pub raw_price: Option<i64>,
    /// Absolute image URLs, deduplicated, in supplier order.
    pub pictures: Vec<String>,
    /// Brand as supplied; empty when the supplier did not provide one.
    pub vendor: String,
    pub attributes: Vec<Param>,
    /// Raw description; may contain HTML or `key: value` lines.
    pub native_description: String,
}

/// A fully normalized offer, ready to be rendered into a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOffer {
    pub id: String,
    pub available: bool,
    /// Always equal to `id`.
    pub vendor_code: String,
    pub name: String,
    /// Retail price; `100` means unknown or suppressed.
    pub price: i64,
    /// Never empty; falls back to the placeholder picture.
    pub pictures: Vec<String>,
    pub vendor: String,
    pub currency: String,
    /// HTML body placed inside the `<description>` CDATA section.
    pub description: String,
    /// Cleaned and sorted parameters.
    pub params: Vec<Param>,
    /// Comma-joined search keywords.
    pub keywords: String,
}
