use crate::app_config::{AppConfig, Environment};
use crate::encoding::OutputEncoding;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files — useful for testing
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but cannot be parsed.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup — no `set_var`/`remove_var` needed.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("FEEDS_ENV", "development"))?;
    let log_level = or_default("FEEDS_LOG_LEVEL", "info");
    let suppliers_path = PathBuf::from(or_default(
        "FEEDS_SUPPLIERS_PATH",
        "./config/suppliers.yaml",
    ));
    let output_dir = PathBuf::from(or_default("FEEDS_OUTPUT_DIR", "./docs"));

    let encoding_raw = or_default("FEEDS_OUTPUT_ENCODING", "windows-1251");
    let output_encoding = encoding_raw
        .parse::<OutputEncoding>()
        .map_err(|reason| invalid("FEEDS_OUTPUT_ENCODING", reason))?;

    let http_timeout_secs = parse_u64("FEEDS_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("FEEDS_USER_AGENT", "supfeed/0.1 (catalog-sync)");
    let max_retries = parse_u32("FEEDS_MAX_RETRIES", "3")?;
    let retry_delay_secs = parse_u64("FEEDS_RETRY_DELAY_SECS", "5")?;

    let max_concurrent_suppliers = parse_usize("FEEDS_MAX_CONCURRENT_SUPPLIERS", "2")?;
    if max_concurrent_suppliers == 0 {
        return Err(invalid(
            "FEEDS_MAX_CONCURRENT_SUPPLIERS",
            "must be at least 1".to_string(),
        ));
    }

    let tz_offset_hours = or_default("FEEDS_TZ_OFFSET_HOURS", "5")
        .parse::<i32>()
        .map_err(|e| invalid("FEEDS_TZ_OFFSET_HOURS", e.to_string()))?;
    if !(-12..=14).contains(&tz_offset_hours) {
        return Err(invalid(
            "FEEDS_TZ_OFFSET_HOURS",
            format!("{tz_offset_hours} is outside -12..=14"),
        ));
    }

    let currency = or_default("FEEDS_CURRENCY", "KZT");
    let placeholder_picture = or_default(
        "FEEDS_PLACEHOLDER_PICTURE",
        "https://placehold.co/800x800/png?text=No+Photo",
    );
    let default_vendor = or_default("FEEDS_DEFAULT_VENDOR", "NoName");
    if default_vendor.trim().is_empty() {
        return Err(invalid(
            "FEEDS_DEFAULT_VENDOR",
            "must be non-empty".to_string(),
        ));
    }
    let validation_sample_size = parse_usize("FEEDS_VALIDATION_SAMPLE_SIZE", "10")?;

    Ok(AppConfig {
        env,
        log_level,
        suppliers_path,
        output_dir,
        output_encoding,
        http_timeout_secs,
        user_agent,
        max_retries,
        retry_delay_secs,
        max_concurrent_suppliers,
        tz_offset_hours,
        currency,
        placeholder_picture,
        default_vendor,
        validation_sample_size,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for anything other than
/// `development`, `test`, or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FEEDS_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
