use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pricing::PricingTable;
use crate::ConfigError;

fn default_enabled() -> bool {
    true
}

fn default_build_hour() -> u8 {
    1
}

fn default_price_field() -> String {
    "price".to_string()
}

/// One supplier adapter as declared in `config/suppliers.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplierConfig {
    pub name: String,
    /// Catalog feed URL.
    pub url: String,
    /// Prepended to every supplier-native product code to form offer ids.
    pub id_prefix: String,
    /// File name inside the output directory; defaults to `{slug}.yml`.
    #[serde(default)]
    pub output_file: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Hour of day (local offset) of the next scheduled build. Written into
    /// feed metadata only; scheduling itself happens outside this program.
    #[serde(default = "default_build_hour")]
    pub build_hour: u8,
    /// Element holding the dealer price in the supplier feed.
    #[serde(default = "default_price_field")]
    pub price_field: String,
    /// Name of the env var holding the feed login, if the feed needs auth.
    #[serde(default)]
    pub login_env: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
    #[serde(default)]
    pub category_allow: Vec<String>,
    #[serde(default)]
    pub category_deny: Vec<String>,
    /// Public-facing brand forced onto every offer of this supplier.
    #[serde(default)]
    pub vendor_override: Option<String>,
    /// Extra attribute names dropped on top of the shared deny-list.
    #[serde(default)]
    pub drop_params: Vec<String>,
    #[serde(default)]
    pub priority_params: Vec<String>,
    #[serde(default)]
    pub extra_keywords: Vec<String>,
    /// Supplier-specific markup table; the shared default applies when absent.
    #[serde(default)]
    pub pricing: Option<PricingTable>,
}

impl SupplierConfig {
    /// Generate a URL-safe slug from the supplier name.
    #[must_use]
    pub fn slug(&self) -> String {
        self.name
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else if c == ' ' || c == '_' {
                    '-'
                } else {
                    '\0'
                }
            })
            .filter(|&c| c != '\0')
            .collect::<String>()
            .split('-')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-")
    }

    #[must_use]
    pub fn output_file_name(&self) -> String {
        self.output_file
            .clone()
            .unwrap_or_else(|| format!("{}.yml", self.slug()))
    }

    #[must_use]
    pub fn pricing_table(&self) -> PricingTable {
        self.pricing.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct SuppliersFile {
    pub suppliers: Vec<SupplierConfig>,
}

impl SuppliersFile {
    /// Suppliers with `enabled: true`, in file order.
    pub fn enabled(&self) -> impl Iterator<Item = &SupplierConfig> {
        self.suppliers.iter().filter(|s| s.enabled)
    }

    #[must_use]
    pub fn find(&self, slug: &str) -> Option<&SupplierConfig> {
        self.suppliers.iter().find(|s| s.slug() == slug)
    }
}

/// Load and validate the suppliers configuration from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_suppliers(path: &Path) -> Result<SuppliersFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SuppliersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let suppliers_file: SuppliersFile = serde_yaml::from_str(&content)?;

    validate_suppliers(&suppliers_file)?;

    Ok(suppliers_file)
}

fn validate_suppliers(suppliers_file: &SuppliersFile) -> Result<(), ConfigError> {
    let mut seen_slugs = HashSet::new();
    let mut seen_prefixes = HashSet::new();

    for supplier in &suppliers_file.suppliers {
        if supplier.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "supplier name must be non-empty".to_string(),
            ));
        }

        if !(supplier.url.starts_with("http://") || supplier.url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has non-http url '{}'",
                supplier.name, supplier.url
            )));
        }

        if supplier.id_prefix.is_empty()
            || !supplier.id_prefix.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has invalid id_prefix '{}'; must be non-empty ASCII alphanumeric",
                supplier.name, supplier.id_prefix
            )));
        }

        if supplier.build_hour > 23 {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has invalid build_hour {}; must be 0-23",
                supplier.name, supplier.build_hour
            )));
        }

        if let Some(category) = supplier
            .category_allow
            .iter()
            .find(|c| supplier.category_deny.contains(c))
        {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' lists category '{category}' in both category_allow and category_deny",
                supplier.name
            )));
        }

        if let Some(table) = &supplier.pricing {
            table.validate().map_err(|source| ConfigError::Pricing {
                supplier: supplier.name.clone(),
                source,
            })?;
        }

        let slug = supplier.slug();
        if slug.is_empty() {
            return Err(ConfigError::Validation(format!(
                "supplier '{}' has no ASCII letters or digits in its name; slug would be empty",
                supplier.name
            )));
        }
        if !seen_slugs.insert(slug.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate supplier slug: '{}' (from supplier '{}')",
                slug, supplier.name
            )));
        }

        if !seen_prefixes.insert(supplier.id_prefix.to_ascii_uppercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate id_prefix '{}' (from supplier '{}'); offer ids would collide",
                supplier.id_prefix, supplier.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "suppliers_test.rs"]
mod tests;
