//! Writes resolved close-up images back into product galleries.

use std::collections::BTreeMap;

use sqlx::SqlitePool;

use crate::DbError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Galleries that gained the close-up URL.
    pub updated: u64,
    /// Galleries that already listed the URL.
    pub unchanged: u64,
    /// Ids with no matching product row.
    pub missing: u64,
}

/// Appends each resolved URL to its product's gallery unless already present.
///
/// `resolved` maps product id to image URL, as written by a resolution run.
/// Ids that are not integers or have no row count as missing.
///
/// # Errors
///
/// Returns [`DbError::Gallery`] if a stored gallery is not a JSON array, or
/// [`DbError::Sqlx`] if a statement fails. Nothing is committed on error.
pub async fn apply_closeups(
    pool: &SqlitePool,
    resolved: &BTreeMap<String, String>,
) -> Result<ApplySummary, DbError> {
    let mut tx = pool.begin().await?;
    let mut summary = ApplySummary::default();

    for (product_id, url) in resolved {
        let Ok(id) = product_id.parse::<i64>() else {
            tracing::warn!(product_id = %product_id, "non-numeric product id, skipping");
            summary.missing += 1;
            continue;
        };

        let gallery: Option<String> =
            sqlx::query_scalar::<_, String>("SELECT gallery FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(gallery) = gallery else {
            tracing::warn!(product_id = id, "no product row for resolved close-up");
            summary.missing += 1;
            continue;
        };

        let mut urls: Vec<String> = if gallery.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&gallery).map_err(|source| DbError::Gallery {
                product_id: id,
                source,
            })?
        };
        if urls.iter().any(|existing| existing == url) {
            summary.unchanged += 1;
            continue;
        }
        urls.push(url.clone());

        let encoded = serde_json::to_string(&urls).map_err(|source| DbError::Gallery {
            product_id: id,
            source,
        })?;
        sqlx::query("UPDATE products SET gallery = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(encoded)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        summary.updated += 1;
    }

    tx.commit().await?;
    tracing::info!(
        updated = summary.updated,
        unchanged = summary.unchanged,
        missing = summary.missing,
        "close-ups applied"
    );
    Ok(summary)
}
