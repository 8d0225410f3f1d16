use std::path::PathBuf;

use supfeed_core::{AppConfig, Environment, OutputEncoding};

/// Config with the documented defaults and retries disabled.
pub(crate) fn test_config() -> AppConfig {
    AppConfig {
        env: Environment::Test,
        log_level: "info".to_string(),
        suppliers_path: PathBuf::from("./config/suppliers.yaml"),
        output_dir: PathBuf::from("./docs"),
        output_encoding: OutputEncoding::Windows1251,
        http_timeout_secs: 30,
        user_agent: "supfeed-test/0.1".to_string(),
        max_retries: 0,
        retry_delay_secs: 0,
        max_concurrent_suppliers: 2,
        tz_offset_hours: 5,
        currency: "KZT".to_string(),
        placeholder_picture: "https://placehold.co/800x800/png?text=No+Photo".to_string(),
        default_vendor: "NoName".to_string(),
        validation_sample_size: 10,
    }
}
