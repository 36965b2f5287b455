use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every setting has a default, so an empty environment yields a usable
/// development configuration pointed at the live catalog site.
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

    let database_url = or_default("DATABASE_URL", "sqlite://data/tilecat.db");
    let env = parse_environment(&or_default("TILECAT_ENV", "development"))?;
    let log_level = or_default("TILECAT_LOG_LEVEL", "info");
    let catalog_path = PathBuf::from(or_default("TILECAT_CATALOG_PATH", "./config/catalog.yaml"));
    let catalog_api_url = lookup("TILECAT_CATALOG_API_URL")
        .ok()
        .filter(|url| !url.trim().is_empty());

    let site_base_url = or_default("TILECAT_SITE_BASE_URL", "https://www.cesantoni.com.mx");
    if !site_base_url.starts_with("http://") && !site_base_url.starts_with("https://") {
        return Err(invalid(
            "TILECAT_SITE_BASE_URL",
            format!("'{site_base_url}' is not an http(s) URL"),
        ));
    }

    let product_path = or_default("TILECAT_PRODUCT_PATH", "/producto/{slug}/");
    if !product_path.contains("{slug}") {
        return Err(invalid(
            "TILECAT_PRODUCT_PATH",
            "template must contain a {slug} placeholder".to_string(),
        ));
    }

    let uploads_path = or_default("TILECAT_UPLOADS_PATH", "/wp-content/uploads/");

    let marker_token = or_default("TILECAT_MARKER_TOKEN", "_C1");
    if marker_token.trim().is_empty() {
        return Err(invalid(
            "TILECAT_MARKER_TOKEN",
            "marker token must be non-empty".to_string(),
        ));
    }

    let db_max_connections = parse_u32("TILECAT_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(invalid(
            "TILECAT_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("TILECAT_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let scraper_request_timeout_secs = parse_u64("TILECAT_SCRAPER_REQUEST_TIMEOUT_SECS", "25")?;
    let scraper_probe_timeout_secs = parse_u64("TILECAT_SCRAPER_PROBE_TIMEOUT_SECS", "10")?;
    let scraper_user_agent = or_default("TILECAT_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_probe_delay_ms = parse_u64("TILECAT_SCRAPER_PROBE_DELAY_MS", "150")?;
    let scraper_product_delay_ms = parse_u64("TILECAT_SCRAPER_PRODUCT_DELAY_MS", "500")?;
    let scraper_crawl_delay_ms = parse_u64("TILECAT_SCRAPER_CRAWL_DELAY_MS", "1000")?;
    let scraper_max_concurrent_products =
        parse_usize("TILECAT_SCRAPER_MAX_CONCURRENT_PRODUCTS", "1")?;
    if scraper_max_concurrent_products == 0 {
        return Err(invalid(
            "TILECAT_SCRAPER_MAX_CONCURRENT_PRODUCTS",
            "must be at least 1".to_string(),
        ));
    }
    let scraper_max_retries = parse_u32("TILECAT_SCRAPER_MAX_RETRIES", "0")?;
    let scraper_retry_backoff_base_secs =
        parse_u64("TILECAT_SCRAPER_RETRY_BACKOFF_BASE_SECS", "2")?;

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        catalog_path,
        catalog_api_url,
        site_base_url,
        product_path,
        uploads_path,
        marker_token,
        db_max_connections,
        db_acquire_timeout_secs,
        scraper_request_timeout_secs,
        scraper_probe_timeout_secs,
        scraper_user_agent,
        scraper_probe_delay_ms,
        scraper_product_delay_ms,
        scraper_crawl_delay_ms,
        scraper_max_concurrent_products,
        scraper_max_retries,
        scraper_retry_backoff_base_secs,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "production" => Ok(Environment::Production),
        "test" => Ok(Environment::Test),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TILECAT_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
