use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One catalog item as supplied by a catalog source (the CRM API or the
/// local database), read once at the start of a run.
///
/// `name` is always non-empty; deserialization rejects records without one.
/// `slug` and `format` are `None` when absent or blank so that slug-based
/// branching never sees an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProductRecord")]
pub struct ProductRecord {
    /// Opaque identifier, stored as a string whether the source used a number or text.
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    /// Free-form dimensions, e.g. `"20 x 120 cm"`.
    pub format: Option<String>,
    /// Image URLs already associated with the product, in source order.
    pub gallery: Vec<String>,
}

impl ProductRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            slug: None,
            format: None,
            gallery: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = non_blank(Some(slug.into()));
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = non_blank(Some(format.into()));
        self
    }

    #[must_use]
    pub fn with_gallery(mut self, gallery: Vec<String>) -> Self {
        self.gallery = gallery;
        self
    }

    /// Returns `true` if any gallery URL contains `marker` (case-sensitive).
    #[must_use]
    pub fn has_marker_image(&self, marker: &str) -> bool {
        self.gallery.iter().any(|url| url.contains(marker))
    }

    /// Identifying fields for follow-up when no image could be resolved.
    #[must_use]
    pub fn unresolved(&self) -> UnresolvedProduct {
        UnresolvedProduct {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
            format: self.format.clone(),
        }
    }
}

/// Wire shape of a catalog record before validation.
#[derive(Debug, Deserialize)]
struct RawProductRecord {
    id: RawId,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    gallery: Option<Gallery>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl TryFrom<RawProductRecord> for ProductRecord {
    type Error = String;

    fn try_from(raw: RawProductRecord) -> Result<Self, Self::Error> {
        let id = match raw.id {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => s.trim().to_string(),
        };
        if id.is_empty() {
            return Err("product id must be non-empty".to_string());
        }

        let name = raw.name.map(|n| n.trim().to_string()).unwrap_or_default();
        if name.is_empty() {
            return Err(format!("product {id} has no name"));
        }

        Ok(Self {
            id,
            name,
            slug: non_blank(raw.slug),
            format: non_blank(raw.format),
            gallery: raw.gallery.map(Gallery::into_urls).unwrap_or_default(),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The gallery field as catalog sources deliver it: either a JSON array of
/// URLs or a string holding a JSON-encoded array. Non-string array entries
/// are dropped; anything else decodes to an empty gallery.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Gallery {
    Items(Vec<serde_json::Value>),
    Encoded(String),
    Other(serde_json::Value),
}

impl Gallery {
    /// Normalizes the field into a list of URLs. Decode failures yield an
    /// empty list rather than an error.
    #[must_use]
    pub fn into_urls(self) -> Vec<String> {
        let items = match self {
            Gallery::Items(items) => items,
            Gallery::Encoded(raw) => serde_json::from_str::<Vec<serde_json::Value>>(&raw)
                .unwrap_or_default(),
            Gallery::Other(_) => Vec::new(),
        };
        items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(url) => Some(url),
                _ => None,
            })
            .collect()
    }
}

/// Identifying data for a product that no strategy could resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedProduct {
    pub id: String,
    pub name: String,
    pub slug: Option<String>,
    pub format: Option<String>,
}

/// Prefix of SKUs synthesized for products the site does not give one.
pub const SKU_PREFIX: &str = "CES-";

/// Attributes extracted from one product page by the crawler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawledProduct {
    pub slug: String,
    pub url: String,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub format: Option<String>,
    pub finish: Option<String>,
    #[serde(rename = "type")]
    pub tile_type: Option<String>,
    pub usage: Option<String>,
    pub pieces_per_box: Option<i64>,
    pub sqm_per_box: Option<f64>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Every key/value pair found in spec tables and lists; keys lowercased.
    #[serde(default)]
    pub specs: BTreeMap<String, String>,
}

impl CrawledProduct {
    /// SKU to store: the scraped one, or [`SKU_PREFIX`] plus the uppercased slug.
    #[must_use]
    pub fn sku_or_default(&self) -> String {
        self.sku
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("{SKU_PREFIX}{}", self.slug.to_uppercase()))
    }

    /// Display name to store: the scraped one, or the slug title-cased.
    #[must_use]
    pub fn name_or_default(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| {
                self.slug
                    .split('-')
                    .filter(|w| !w.is_empty())
                    .map(capitalize)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
    }
}

/// Uppercases the first character and lowercases the rest.
#[must_use]
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn decode(value: serde_json::Value) -> Result<ProductRecord, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn numeric_id_becomes_string() {
        let p = decode(json!({"id": 7, "name": "Sunset Maple"})).unwrap();
        assert_eq!(p.id, "7");
        assert!(p.slug.is_none());
        assert!(p.gallery.is_empty());
    }

    #[test]
    fn string_id_is_kept() {
        let p = decode(json!({"id": "ces-42", "name": "Cabo"})).unwrap();
        assert_eq!(p.id, "ces-42");
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(decode(json!({"id": 1})).is_err());
        assert!(decode(json!({"id": 1, "name": "   "})).is_err());
    }

    #[test]
    fn blank_slug_and_format_become_none() {
        let p = decode(json!({"id": 1, "name": "Alpes Malla", "slug": "", "format": "  "})).unwrap();
        assert!(p.slug.is_none());
        assert!(p.format.is_none());
    }

    #[test]
    fn gallery_accepts_array() {
        let p = decode(json!({
            "id": 1,
            "name": "Cabo",
            "gallery": ["https://x/CABO_C1.jpg", "https://x/CABO_2.jpg"]
        }))
        .unwrap();
        assert_eq!(p.gallery.len(), 2);
    }

    #[test]
    fn gallery_accepts_encoded_string() {
        let p = decode(json!({
            "id": 1,
            "name": "Cabo",
            "gallery": "[\"https://x/CABO_C1.jpg\"]"
        }))
        .unwrap();
        assert_eq!(p.gallery, vec!["https://x/CABO_C1.jpg".to_string()]);
    }

    #[test]
    fn gallery_keeps_string_entries_around_odd_ones() {
        let p = decode(json!({
            "id": 1,
            "name": "Cabo",
            "gallery": ["https://x/CABO_C1.jpg", null, 3]
        }))
        .unwrap();
        assert_eq!(p.gallery, vec!["https://x/CABO_C1.jpg".to_string()]);
        assert!(p.has_marker_image("_C1"));

        let p = decode(json!({
            "id": 1,
            "name": "Cabo",
            "gallery": "[\"https://x/CABO_C1.jpg\", null]"
        }))
        .unwrap();
        assert_eq!(p.gallery, vec!["https://x/CABO_C1.jpg".to_string()]);
    }

    #[test]
    fn malformed_encoded_gallery_is_empty() {
        let p = decode(json!({"id": 1, "name": "Cabo", "gallery": "[not json"})).unwrap();
        assert!(p.gallery.is_empty());
    }

    #[test]
    fn null_or_odd_gallery_is_empty() {
        let p = decode(json!({"id": 1, "name": "Cabo", "gallery": null})).unwrap();
        assert!(p.gallery.is_empty());
        let p = decode(json!({"id": 1, "name": "Cabo", "gallery": {"a": 1}})).unwrap();
        assert!(p.gallery.is_empty());
        let p = decode(json!({"id": 1, "name": "Cabo", "gallery": [1, 2]})).unwrap();
        assert!(p.gallery.is_empty());
    }

    #[test]
    fn has_marker_image_is_case_sensitive() {
        let p = ProductRecord::new("1", "Cabo").with_gallery(vec![
            "https://x/CABO_c1.jpg".to_string(),
            "https://x/CABO.jpg".to_string(),
        ]);
        assert!(!p.has_marker_image("_C1"));
        let p = p.with_gallery(vec!["https://x/CABO_C1.jpg".to_string()]);
        assert!(p.has_marker_image("_C1"));
    }

    #[test]
    fn unresolved_keeps_identifying_fields() {
        let p = ProductRecord::new("9", "Alpes Malla").with_format("30x30cm");
        let u = p.unresolved();
        assert_eq!(u.id, "9");
        assert_eq!(u.name, "Alpes Malla");
        assert!(u.slug.is_none());
        assert_eq!(u.format.as_deref(), Some("30x30cm"));
    }

    #[test]
    fn crawled_defaults_from_slug() {
        let crawled = CrawledProduct {
            slug: "quarzo-di-siena".to_string(),
            ..CrawledProduct::default()
        };
        assert_eq!(crawled.sku_or_default(), "CES-QUARZO-DI-SIENA");
        assert_eq!(crawled.name_or_default(), "Quarzo Di Siena");
    }

    #[test]
    fn crawled_type_field_serializes_as_type() {
        let crawled = CrawledProduct {
            slug: "cabo".to_string(),
            tile_type: Some("Porcelanato".to_string()),
            ..CrawledProduct::default()
        };
        let value = serde_json::to_value(&crawled).unwrap();
        assert_eq!(value["type"], "Porcelanato");
    }

    #[test]
    fn capitalize_lowercases_tail() {
        assert_eq!(capitalize("cALACATTA"), "Calacatta");
        assert_eq!(capitalize(""), "");
    }
}
