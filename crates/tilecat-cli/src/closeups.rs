//! `closeups` command: resolve missing close-up images and report them.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use tilecat_core::{AppConfig, ProductRecord, ResolutionReport};
use tilecat_scraper::{FixedDelay, Resolver, ResolverSettings, SiteClient};

/// Where the product catalog for a close-up run comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum CatalogSource {
    /// The CRM's JSON product endpoint (`TILECAT_CATALOG_API_URL`).
    Api,
    /// The local product database.
    Db,
}

/// Resolves close-ups for every catalog product lacking one, prints the
/// summary, and writes the report to `output` unless `dry_run` is set.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or the report cannot be
/// written. Failures while resolving a single product only leave that
/// product unresolved.
pub(crate) async fn run_closeups(
    config: &AppConfig,
    source: CatalogSource,
    output: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    let client = SiteClient::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build site client: {e}"))?;

    let products = load_products(config, &client, source)
        .await
        .context("failed to read product catalog")?;
    tracing::info!(source = ?source, products = products.len(), "catalog loaded");

    let resolver = Resolver::new(
        &client,
        &client,
        FixedDelay::from_config(config),
        ResolverSettings::from_config(config),
    )?;
    let report = resolver
        .resolve_all(&products, config.scraper_max_concurrent_products)
        .await;

    print!("{}", format_summary(&report)?);

    if dry_run {
        println!("dry-run: report not written");
        return Ok(());
    }
    report.save(output)?;
    println!("report written to {}", output.display());
    Ok(())
}

async fn load_products(
    config: &AppConfig,
    client: &SiteClient,
    source: CatalogSource,
) -> anyhow::Result<Vec<ProductRecord>> {
    match source {
        CatalogSource::Api => {
            let Some(api_url) = config.catalog_api_url.as_deref() else {
                anyhow::bail!("TILECAT_CATALOG_API_URL is not set; use --source db or set it");
            };
            Ok(client.fetch_catalog(api_url).await?)
        }
        CatalogSource::Db => {
            let pool = tilecat_db::connect_pool(
                &config.database_url,
                tilecat_db::PoolConfig::from_app_config(config),
            )
            .await?;
            tilecat_db::run_migrations(&pool).await?;
            Ok(tilecat_db::list_catalog(&pool).await?)
        }
    }
}

/// Renders the run summary followed by the found and unresolved lists.
fn format_summary(report: &ResolutionReport) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    write_summary(&mut out, report)?;
    Ok(out)
}

fn write_summary(out: &mut String, report: &ResolutionReport) -> std::fmt::Result {
    writeln!(out, "total products:     {}", report.total_products)?;
    writeln!(out, "already had marker: {}", report.already_had_marker)?;
    writeln!(out, "searched:           {}", report.searched())?;
    writeln!(out, "found:              {}", report.resolved.len())?;
    writeln!(out, "not found:          {}", report.unresolved.len())?;

    if !report.resolved.is_empty() {
        writeln!(out, "\nfound close-ups:")?;
        for (id, url) in &report.resolved {
            writeln!(out, "  [{id}] {url}")?;
        }
    }

    if !report.unresolved.is_empty() {
        writeln!(out, "\nunresolved products:")?;
        for product in &report.unresolved {
            writeln!(
                out,
                "  [{}] {} (slug: {}, format: {})",
                product.id,
                product.name,
                product.slug.as_deref().unwrap_or("-"),
                product.format.as_deref().unwrap_or("-"),
            )?;
        }
    }
    Ok(())
}
