//! `import` and `apply-closeups` commands: load crawl and resolution output
//! into the product database.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use tilecat_core::{CrawledProduct, ResolutionReport};
use tilecat_db::{ImportMode, ProductRow};

/// Rows listed after an import so the stored shape can be eyeballed.
const SAMPLE_ROWS: i64 = 5;

/// Command-line spelling of [`ImportMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ImportModeArg {
    /// Delete every product, then import the file
    Replace,
    /// Update matching products and add new ones
    Merge,
    /// Add only products not already present
    InsertNew,
}

impl From<ImportModeArg> for ImportMode {
    fn from(arg: ImportModeArg) -> Self {
        match arg {
            ImportModeArg::Replace => ImportMode::Replace,
            ImportModeArg::Merge => ImportMode::Merge,
            ImportModeArg::InsertNew => ImportMode::InsertNew,
        }
    }
}

/// Imports a crawl output file. With no `mode`, prints the file and database
/// counts and leaves the database untouched.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the import
/// transaction fails.
pub(crate) async fn run_import(
    pool: &sqlx::SqlitePool,
    input: &Path,
    mode: Option<ImportMode>,
) -> anyhow::Result<()> {
    let products = read_products(input)?;
    let existing = tilecat_db::count_products(pool).await?;
    println!("products in {}: {}", input.display(), products.len());
    println!("products in database: {existing}");

    let Some(mode) = mode else {
        tracing::debug!(input = %input.display(), "import cancelled without a mode");
        println!("no --mode given (replace, merge, insert-new); import cancelled");
        return Ok(());
    };

    let summary = tilecat_db::import_products(pool, &products, mode).await?;
    if summary.removed > 0 {
        println!("removed:  {}", summary.removed);
    }
    println!("imported: {}", summary.imported);
    println!("updated:  {}", summary.updated);
    println!("skipped:  {}", summary.skipped);
    println!("total in database: {}", summary.total);

    let sample = tilecat_db::list_products(pool, SAMPLE_ROWS).await?;
    if !sample.is_empty() {
        println!("\nsample rows:");
        for row in &sample {
            println!("{}", sample_line(row));
        }
    }
    Ok(())
}

/// Appends every resolved close-up in a report to its product's gallery.
///
/// # Errors
///
/// Returns an error if the report cannot be read or the update fails.
pub(crate) async fn run_apply_closeups(
    pool: &sqlx::SqlitePool,
    input: &Path,
) -> anyhow::Result<()> {
    let report = ResolutionReport::load(input)?;
    if report.resolved.is_empty() {
        println!("no resolved close-ups in {}", input.display());
        return Ok(());
    }

    let summary = tilecat_db::apply_closeups(pool, &report.resolved).await?;
    println!("galleries updated:   {}", summary.updated);
    println!("already present:     {}", summary.unchanged);
    println!("unknown product ids: {}", summary.missing);
    Ok(())
}

fn read_products(path: &Path) -> anyhow::Result<Vec<CrawledProduct>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body)
        .with_context(|| format!("{} is not a JSON array of crawled products", path.display()))
}

fn sample_line(row: &ProductRow) -> String {
    let images = serde_json::from_str::<Vec<String>>(&row.gallery).map_or(0, |g| g.len());
    format!(
        "  [{}] {} | sku: {} | format: {} | gallery: {images}",
        row.id,
        row.name,
        row.sku.as_deref().unwrap_or("-"),
        row.format.as_deref().unwrap_or("-"),
    )
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    #[test]
    fn reads_crawl_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("productos.json");
        std::fs::write(
            &path,
            r#"[{"slug": "alabama", "url": "https://tiles.test/producto/alabama/",
                 "name": "Alabama", "sku": null, "category": null, "format": "20x120cm",
                 "finish": null, "type": "Porcelánico", "usage": null,
                 "pieces_per_box": 6, "sqm_per_box": 1.44, "image_url": null}]"#,
        )
        .unwrap();

        let products = read_products(&path).unwrap();

        assert_eq!(products.len(), 1);
        assert_eq!(products[0].tile_type.as_deref(), Some("Porcelánico"));
        assert!(products[0].images.is_empty());
    }

    #[test]
    fn rejects_non_array_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("productos.json");
        std::fs::write(&path, r#"{"products": []}"#).unwrap();
        assert!(read_products(&path).is_err());
    }

    #[test]
    fn mode_arg_maps_onto_import_mode() {
        assert_eq!(ImportMode::from(ImportModeArg::Replace), ImportMode::Replace);
        assert_eq!(ImportMode::from(ImportModeArg::Merge), ImportMode::Merge);
        assert_eq!(ImportMode::from(ImportModeArg::InsertNew), ImportMode::InsertNew);
    }

    #[tokio::test]
    async fn sample_lines_describe_imported_rows() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        tilecat_db::MIGRATOR.run(&pool).await.unwrap();
        let products = vec![CrawledProduct {
            slug: "alabama".to_owned(),
            url: "https://tiles.test/producto/alabama/".to_owned(),
            name: Some("Alabama".to_owned()),
            format: Some("20x120cm".to_owned()),
            ..CrawledProduct::default()
        }];
        tilecat_db::import_products(&pool, &products, ImportMode::Merge)
            .await
            .unwrap();

        let rows = tilecat_db::list_products(&pool, SAMPLE_ROWS).await.unwrap();
        assert_eq!(rows.len(), 1);
        let id = rows[0].id;
        assert_eq!(
            sample_line(&rows[0]),
            format!("  [{id}] Alabama | sku: CES-ALABAMA | format: 20x120cm | gallery: 0")
        );

        let closeups = std::collections::BTreeMap::from([(
            id.to_string(),
            "https://tiles.test/wp-content/uploads/ALABAMA_C1.jpg".to_owned(),
        )]);
        tilecat_db::apply_closeups(&pool, &closeups).await.unwrap();

        let rows = tilecat_db::list_products(&pool, SAMPLE_ROWS).await.unwrap();
        assert!(sample_line(&rows[0]).ends_with("gallery: 1"));
    }
}
