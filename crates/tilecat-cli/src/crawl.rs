//! `crawl` command: seed catalog pages into a JSON product file.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tilecat_core::{AppConfig, CatalogFile, CrawledProduct, SeedProduct};
use tilecat_scraper::{crawl_catalog, site_token, SiteClient};

/// Crawls the seed catalog and writes the parsed products to `output`.
///
/// Pages that cannot be fetched are listed at the end of the run and do not
/// stop it.
///
/// # Errors
///
/// Returns an error if the seed catalog cannot be loaded, the HTTP client
/// cannot be built, or the output file cannot be written.
pub(crate) async fn run_crawl(
    config: &AppConfig,
    output: &Path,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let catalog = tilecat_core::load_catalog(&config.catalog_path)?;
    let seeds = seed_products(&catalog, limit);

    let client = SiteClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build site client: {e}"))?;
    let host_token = site_token(&config.site_base_url);

    println!("crawling {} product pages", seeds.len());
    let report = crawl_catalog(
        &client,
        &config.product_url_template(),
        seeds,
        &host_token,
        Duration::from_millis(config.scraper_crawl_delay_ms),
    )
    .await;

    write_products(output, &report.products)?;

    println!(
        "crawled {} of {} products -> {}",
        report.products.len(),
        seeds.len(),
        output.display()
    );
    if !report.failed.is_empty() {
        println!("failed pages ({}):", report.failed.len());
        for url in &report.failed {
            println!("  - {url}");
        }
    }
    Ok(())
}

fn seed_products(catalog: &CatalogFile, limit: Option<usize>) -> &[SeedProduct] {
    let count = limit.map_or(catalog.products.len(), |n| n.min(catalog.products.len()));
    &catalog.products[..count]
}

fn write_products(path: &Path, products: &[CrawledProduct]) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(products)?;
    std::fs::write(path, body + "\n")
        .with_context(|| format!("failed to write {}", path.display()))
}
