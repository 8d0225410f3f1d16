use std::path::PathBuf;

use crate::encoding::OutputEncoding;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Process-wide settings, built once at startup and passed down by reference.
///
/// Nothing in the normalization crates reads the environment directly; every
/// knob they need arrives through this struct or a [`crate::SupplierConfig`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub suppliers_path: PathBuf,
    pub output_dir: PathBuf,
    pub output_encoding: OutputEncoding,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub max_concurrent_suppliers: usize,
    /// Fixed UTC offset used for every timestamp written into feed metadata.
    pub tz_offset_hours: i32,
    pub currency: String,
    pub placeholder_picture: String,
    pub default_vendor: String,
    /// Maximum number of offending offer ids quoted per violation category.
    pub validation_sample_size: usize,
}
