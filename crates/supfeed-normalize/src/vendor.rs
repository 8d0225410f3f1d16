//! Brand resolution for offers that arrive without a vendor.

use regex::Regex;
use supfeed_core::Param;

const DEFAULT_BRANDS: &[&str] = &[
    "HP",
    "Canon",
    "Epson",
    "Brother",
    "Samsung",
    "Xerox",
    "Kyocera",
    "Ricoh",
    "Lexmark",
    "Pantum",
    "Sharp",
    "OKI",
    "Panasonic",
    "Lenovo",
    "Dell",
    "Asus",
    "Acer",
    "Apple",
    "Logitech",
    "Philips",
    "APC",
    "Eaton",
    "Ippon",
    "Powercom",
    "TP-Link",
    "D-Link",
    "MikroTik",
    "Huawei",
    "Xiaomi",
    "LG",
    "Sony",
    "Toshiba",
    "Kingston",
    "Transcend",
    "Seagate",
    "Defender",
    "Gembird",
];

/// Ordered `(pattern, brand)` pairs. The first matching entry wins.
#[derive(Debug, Clone)]
pub struct BrandTable {
    entries: Vec<(Regex, String)>,
}

impl BrandTable {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a brand matched by its own name as a whole word.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] only if the escaped name exceeds regex size
    /// limits.
    pub fn with_brand(self, brand: &str) -> Result<Self, regex::Error> {
        let pattern = regex::escape(brand);
        self.with_pattern(&pattern, brand)
    }

    /// Appends a custom pattern, wrapped in word boundaries and matched
    /// case-insensitively, that resolves to `brand`.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if `pattern` is not a valid regex.
    pub fn with_pattern(mut self, pattern: &str, brand: &str) -> Result<Self, regex::Error> {
        let re = Regex::new(&format!(r"(?i)\b(?:{pattern})\b"))?;
        self.entries.push((re, brand.to_string()));
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First brand whose pattern matches `text`.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, brand)| brand.as_str())
    }
}

impl Default for BrandTable {
    fn default() -> Self {
        let aliases = [
            (r"Hewlett[\s-]*Packard", "HP"),
            (r"Konica[\s-]*Minolta", "Konica Minolta"),
            (r"Western\s+Digital", "Western Digital"),
        ];
        let mut entries: Vec<(Regex, String)> = Vec::new();
        for (pattern, brand) in aliases {
            if let Ok(re) = Regex::new(&format!(r"(?i)\b(?:{pattern})\b")) {
                entries.push((re, brand.to_string()));
            }
        }
        for brand in DEFAULT_BRANDS {
            if let Ok(re) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(brand))) {
                entries.push((re, (*brand).to_string()));
            }
        }
        Self { entries }
    }
}

/// Resolves the public vendor of an offer.
///
/// A non-empty supplied vendor is used as-is. Otherwise the name, then the
/// description, then each attribute value is checked against `brands`; the
/// first hit wins. With no hit the `default_vendor` house brand is used.
#[must_use]
pub fn pick_vendor(
    supplied: &str,
    name: &str,
    description: &str,
    params: &[Param],
    brands: &BrandTable,
    default_vendor: &str,
) -> String {
    let supplied = supplied.trim();
    if !supplied.is_empty() {
        return supplied.to_string();
    }

    std::iter::once(name)
        .chain(std::iter::once(description))
        .chain(params.iter().map(|p| p.value.as_str()))
        .find_map(|text| brands.find(text))
        .unwrap_or(default_vendor)
        .to_string()
}
