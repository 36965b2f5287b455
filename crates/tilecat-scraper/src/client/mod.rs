//! HTTP client for the catalog site: page fetches, existence probes, and the
//! CRM catalog endpoint.

mod origin;

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tilecat_core::{AppConfig, ProductRecord};

use crate::error::ScraperError;
use crate::oracle::{ExistenceProbe, PageSource};
use crate::rate_limit::retry_with_backoff;

pub use origin::site_token;

/// HTTP client for the catalog site.
///
/// Page fetches map 404, 429, and other non-2xx responses to typed errors
/// and retry transient ones. Through [`PageSource`] and [`ExistenceProbe`]
/// every failure collapses to "absent" / `false`, which is what the resolver
/// consumes.
pub struct SiteClient {
    client: Client,
    /// Hard upper bound for a single existence probe.
    probe_timeout: Duration,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in seconds for exponential backoff: `backoff_base_secs * 2^attempt`.
    backoff_base_secs: u64,
}

impl SiteClient {
    /// Creates a `SiteClient` with the given timeouts, `User-Agent`, and retry policy.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        probe_timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            probe_timeout: Duration::from_secs(probe_timeout_secs),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Builds a client from the scraper settings in [`AppConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the client cannot be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ScraperError> {
        Self::new(
            config.scraper_request_timeout_secs,
            config.scraper_probe_timeout_secs,
            &config.scraper_user_agent,
            config.scraper_max_retries,
            config.scraper_retry_backoff_base_secs,
        )
    }

    /// Fetches `url` and returns the body as text, retrying transient errors.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`ScraperError::NotFound`] — HTTP 404 (not retried).
    /// - [`ScraperError::UnexpectedStatus`] — any other non-2xx status.
    /// - [`ScraperError::Http`] — network, TLS, or timeout failure.
    pub async fn fetch_text(&self, url: &str) -> Result<String, ScraperError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || async move {
            let response = self
                .client
                .get(url)
                .header(
                    reqwest::header::ACCEPT,
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
                )
                .header(reqwest::header::ACCEPT_LANGUAGE, "es-MX,es;q=0.9,en;q=0.8")
                .send()
                .await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ScraperError::RateLimited {
                    domain: origin::extract_domain(url),
                    retry_after_secs,
                });
            }

            if status == StatusCode::NOT_FOUND {
                return Err(ScraperError::NotFound {
                    url: url.to_owned(),
                });
            }

            if !status.is_success() {
                return Err(ScraperError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_owned(),
                });
            }

            Ok(response.text().await?)
        })
        .await
    }

    /// Reads the product catalog from the CRM's JSON endpoint.
    ///
    /// This is the one read whose failure aborts a close-up run. Records
    /// that do not form a valid product (no id, no name) are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Propagates [`Self::fetch_text`] errors and returns
    /// [`ScraperError::Deserialize`] if the body is not a JSON array.
    pub async fn fetch_catalog(&self, api_url: &str) -> Result<Vec<ProductRecord>, ScraperError> {
        let body = self.fetch_text(api_url).await?;
        let records =
            serde_json::from_str::<Vec<serde_json::Value>>(&body).map_err(|e| {
                ScraperError::Deserialize {
                    context: format!("catalog from {api_url}"),
                    source: e,
                }
            })?;

        let total = records.len();
        let products: Vec<ProductRecord> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| {
                serde_json::from_value::<ProductRecord>(record)
                    .inspect_err(|e| {
                        tracing::warn!(index, error = %e, "skipping invalid catalog record");
                    })
                    .ok()
            })
            .collect();
        tracing::debug!(total, valid = products.len(), "catalog decoded");
        Ok(products)
    }

    /// Checks whether `url` exists on the remote host.
    ///
    /// Sends a `HEAD` first; `200` means it exists. Servers that reject
    /// `HEAD` (error status or transport failure) get a one-byte ranged
    /// `GET`, which counts on `200` or `206`. Timeouts and every other
    /// outcome count as "does not exist".
    pub async fn probe(&self, url: &str) -> bool {
        match self
            .client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) if resp.status() == StatusCode::OK => return true,
            Ok(resp) if !resp.status().is_client_error() && !resp.status().is_server_error() => {
                return false;
            }
            Ok(resp) => {
                tracing::trace!(url, status = resp.status().as_u16(), "HEAD rejected, trying ranged GET");
            }
            Err(e) => {
                tracing::trace!(url, error = %e, "HEAD failed, trying ranged GET");
            }
        }

        match self
            .client
            .get(url)
            .header(reqwest::header::RANGE, "bytes=0-0")
            .timeout(self.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => matches!(resp.status(), StatusCode::OK | StatusCode::PARTIAL_CONTENT),
            Err(_) => false,
        }
    }
}

impl PageSource for SiteClient {
    async fn fetch_page(&self, url: &str) -> Option<String> {
        match self.fetch_text(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                tracing::debug!(url, error = %e, "page fetch failed");
                None
            }
        }
    }
}

impl ExistenceProbe for SiteClient {
    async fn exists(&self, url: &str) -> bool {
        self.probe(url).await
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
