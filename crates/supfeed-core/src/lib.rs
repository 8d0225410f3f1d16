pub mod app_config;
pub mod config;
pub mod encoding;
pub mod offer;
pub mod pricing;
pub mod suppliers;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use encoding::OutputEncoding;
pub use offer::{CanonicalOffer, OutputOffer, Param};
pub use pricing::{PricingError, PricingTable, PricingTier};
pub use suppliers::{load_suppliers, SupplierConfig, SuppliersFile};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read suppliers file {path}: {source}")]
    SuppliersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse suppliers file: {0}")]
    SuppliersFileParse(#[from] serde_yaml::Error),

    #[error("invalid pricing table for supplier '{supplier}': {source}")]
    Pricing {
        supplier: String,
        #[source]
        source: PricingError,
    },

    #[error("suppliers config validation failed: {0}")]
    Validation(String),
}
