//! Database operations for the `products` table: crawl import and catalog reads.

use chrono::NaiveDateTime;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tilecat_core::{CrawledProduct, Gallery, ProductRecord};

use crate::DbError;

/// Category assigned to imported products the crawl did not categorize.
const DEFAULT_CATEGORY: &str = "Pisos";
/// List price assigned to newly imported products.
const DEFAULT_BASE_PRICE: f64 = 450.0;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub sku: Option<String>,
    pub slug: Option<String>,
    pub name: String,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub format: Option<String>,
    /// JSON array of image URLs.
    pub gallery: String,
    pub active: bool,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: i64,
    name: String,
    slug: Option<String>,
    format: Option<String>,
    gallery: String,
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// How [`import_products`] treats rows already in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Delete every product, then insert the crawl. Input entries whose SKU
    /// or slug repeats an earlier entry are skipped.
    Replace,
    /// Update products matched by SKU or slug; insert the rest.
    Merge,
    /// Insert only products not matched by SKU or slug; leave others untouched.
    InsertNew,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub removed: u64,
    pub imported: u64,
    pub updated: u64,
    pub skipped: u64,
    /// Products in the table after the import.
    pub total: i64,
}

/// Loads crawled products into the `products` table in one transaction.
///
/// Merge updates overwrite `name`, `url`, and `image_url`, and keep existing
/// values for the other attributes when the crawl has none.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement fails; nothing is committed.
pub async fn import_products(
    pool: &SqlitePool,
    products: &[CrawledProduct],
    mode: ImportMode,
) -> Result<ImportSummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = ImportSummary::default();

    if mode == ImportMode::Replace {
        summary.removed = sqlx::query("DELETE FROM products")
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }

    for product in products {
        let sku = product.sku_or_default();
        let existing: Option<i64> =
            sqlx::query_scalar::<_, i64>("SELECT id FROM products WHERE sku = ? OR slug = ? LIMIT 1")
                .bind(&sku)
                .bind(&product.slug)
                .fetch_optional(&mut *tx)
                .await?;

        match (existing, mode) {
            (Some(id), ImportMode::Merge) => {
                update_product(&mut tx, id, product).await?;
                summary.updated += 1;
            }
            (None, _) => {
                insert_product(&mut tx, &sku, product).await?;
                summary.imported += 1;
            }
            (Some(_), _) => {
                tracing::debug!(sku = %sku, slug = %product.slug, "product already present, skipping");
                summary.skipped += 1;
            }
        }
    }

    summary.total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        removed = summary.removed,
        imported = summary.imported,
        updated = summary.updated,
        skipped = summary.skipped,
        total = summary.total,
        "product import committed"
    );
    Ok(summary)
}

async fn insert_product(
    tx: &mut Transaction<'_, Sqlite>,
    sku: &str,
    product: &CrawledProduct,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO products \
             (sku, slug, name, url, image_url, category, format, finish, type, usage, \
              pieces_per_box, sqm_per_box, base_price, active) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(sku)
    .bind(&product.slug)
    .bind(product.name_or_default())
    .bind(&product.url)
    .bind(&product.image_url)
    .bind(product.category.as_deref().unwrap_or(DEFAULT_CATEGORY))
    .bind(&product.format)
    .bind(&product.finish)
    .bind(&product.tile_type)
    .bind(&product.usage)
    .bind(product.pieces_per_box)
    .bind(product.sqm_per_box)
    .bind(DEFAULT_BASE_PRICE)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn update_product(
    tx: &mut Transaction<'_, Sqlite>,
    id: i64,
    product: &CrawledProduct,
) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE products SET \
             name           = ?, \
             url            = ?, \
             image_url      = ?, \
             category       = COALESCE(?, category), \
             format         = COALESCE(?, format), \
             finish         = COALESCE(?, finish), \
             type           = COALESCE(?, type), \
             usage          = COALESCE(?, usage), \
             pieces_per_box = COALESCE(?, pieces_per_box), \
             sqm_per_box    = COALESCE(?, sqm_per_box), \
             updated_at     = CURRENT_TIMESTAMP \
         WHERE id = ?",
    )
    .bind(product.name_or_default())
    .bind(&product.url)
    .bind(&product.image_url)
    .bind(&product.category)
    .bind(&product.format)
    .bind(&product.finish)
    .bind(&product.tile_type)
    .bind(&product.usage)
    .bind(product.pieces_per_box)
    .bind(product.sqm_per_box)
    .bind(id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Returns active products as catalog records for close-up resolution.
///
/// A gallery column that is not a JSON array reads as an empty gallery.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_catalog(pool: &SqlitePool) -> Result<Vec<ProductRecord>, DbError> {
    let rows = sqlx::query_as::<_, CatalogRow>(
        "SELECT id, name, slug, format, gallery FROM products WHERE active = 1 ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    let records = rows
        .into_iter()
        .filter(|row| {
            let named = !row.name.trim().is_empty();
            if !named {
                tracing::warn!(product_id = row.id, "skipping product without a name");
            }
            named
        })
        .map(|row| {
            let mut record = ProductRecord::new(row.id.to_string(), row.name.trim())
                .with_gallery(Gallery::Encoded(row.gallery).into_urls());
            if let Some(slug) = row.slug {
                record = record.with_slug(slug);
            }
            if let Some(format) = row.format {
                record = record.with_format(format);
            }
            record
        })
        .collect();
    Ok(records)
}

/// Number of rows in the `products` table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_products(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Returns up to `limit` products ordered by id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(pool: &SqlitePool, limit: i64) -> Result<Vec<ProductRow>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, sku, slug, name, url, image_url, category, format, gallery, active, updated_at \
         FROM products ORDER BY id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
