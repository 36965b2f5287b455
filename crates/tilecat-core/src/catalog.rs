//! Seed catalog: the fixed list of product pages the crawler visits.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedProduct {
    /// Product page slug, e.g. `"sunset-maple"`.
    pub slug: String,
    /// Display name the crawler uses when the product page has no `<h1>`.
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

impl CatalogFile {
    #[must_use]
    pub fn slugs(&self) -> Vec<&str> {
        self.products.iter().map(|p| p.slug.as_str()).collect()
    }
}

/// Load and validate the seed catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for product in &catalog.products {
        let slug = product.slug.trim();
        if slug.is_empty() {
            return Err(ConfigError::Validation(
                "product slug must be non-empty".to_string(),
            ));
        }

        if slug.contains('/') || slug.contains(char::is_whitespace) {
            return Err(ConfigError::Validation(format!(
                "product slug '{slug}' must not contain '/' or whitespace"
            )));
        }

        if !seen.insert(slug.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate product slug: '{slug}'"
            )));
        }
    }

    Ok(())
}
