use std::path::PathBuf;

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

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub catalog_path: PathBuf,
    /// Remote JSON endpoint listing the current product catalog, if any.
    pub catalog_api_url: Option<String>,
    pub site_base_url: String,
    /// Product page path template; `{slug}` is substituted per product.
    pub product_path: String,
    pub uploads_path: String,
    pub marker_token: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_probe_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_probe_delay_ms: u64,
    pub scraper_product_delay_ms: u64,
    pub scraper_crawl_delay_ms: u64,
    pub scraper_max_concurrent_products: usize,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
}

impl AppConfig {
    /// Absolute upload base URL, always ending in `/`.
    #[must_use]
    pub fn uploads_base_url(&self) -> String {
        let base = self.site_base_url.trim_end_matches('/');
        let path = self.uploads_path.trim_matches('/');
        format!("{base}/{path}/")
    }

    /// Absolute product page URL template with a `{slug}` placeholder.
    #[must_use]
    pub fn product_url_template(&self) -> String {
        let base = self.site_base_url.trim_end_matches('/');
        let path = self.product_path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("catalog_path", &self.catalog_path)
            .field("database_url", &"[redacted]")
            .field("catalog_api_url", &self.catalog_api_url)
            .field("site_base_url", &self.site_base_url)
            .field("product_path", &self.product_path)
            .field("uploads_path", &self.uploads_path)
            .field("marker_token", &self.marker_token)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "scraper_request_timeout_secs",
                &self.scraper_request_timeout_secs,
            )
            .field("scraper_probe_timeout_secs", &self.scraper_probe_timeout_secs)
            .field("scraper_user_agent", &self.scraper_user_agent)
            .field("scraper_probe_delay_ms", &self.scraper_probe_delay_ms)
            .field("scraper_product_delay_ms", &self.scraper_product_delay_ms)
            .field("scraper_crawl_delay_ms", &self.scraper_crawl_delay_ms)
            .field(
                "scraper_max_concurrent_products",
                &self.scraper_max_concurrent_products,
            )
            .field("scraper_max_retries", &self.scraper_max_retries)
            .field(
                "scraper_retry_backoff_base_secs",
                &self.scraper_retry_backoff_base_secs,
            )
            .finish()
    }
}
