//! Marker-tagged image URL extraction and product-name filters.

use regex::Regex;

use crate::error::ScraperError;

/// Image extensions the site serves close-ups in.
const EXTENSION_ALTERNATION: &str = "jpg|jpeg|png|webp";

/// Minimum length of a first word for the partial-name filter to apply.
const MIN_PARTIAL_WORD_CHARS: usize = 4;

/// Regexes derived from the close-up marker token (e.g. `_C1`).
///
/// Extraction is case-insensitive. The scoring checks in [`crate::resolver::score`]
/// keep their original case sensitivity: the digit-boundary check is
/// case-sensitive, the marker-before-extension check is not.
#[derive(Debug, Clone)]
pub struct MarkerPatterns {
    marker: String,
    tagged_url: Regex,
    pub(crate) exact: Regex,
    pub(crate) before_extension: Regex,
    pub(crate) suffixed: Regex,
}

impl MarkerPatterns {
    /// Compiles the patterns for `marker`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Pattern`] if a pattern fails to compile.
    pub fn new(marker: &str) -> Result<Self, ScraperError> {
        let m = regex::escape(marker);
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| ScraperError::Pattern {
                marker: marker.to_owned(),
                source: e,
            })
        };

        Ok(Self {
            marker: marker.to_owned(),
            tagged_url: compile(format!(
                r#"(?i)https?://[^\s"'<>]+?{m}[^\s"'<>]*\.(?:{EXTENSION_ALTERNATION})"#
            ))?,
            exact: compile(format!("{m}[^0-9]"))?,
            before_extension: compile(format!(r"(?i){m}\.(?:{EXTENSION_ALTERNATION})"))?,
            suffixed: compile(format!("{m}-"))?,
        })
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Returns every absolute image URL in `html` that carries the marker,
    /// de-duplicated, in order of first appearance.
    #[must_use]
    pub fn extract_tagged_urls(&self, html: &str) -> Vec<String> {
        let mut urls: Vec<String> = Vec::new();
        for m in self.tagged_url.find_iter(html) {
            let url = m.as_str();
            if !urls.iter().any(|seen| seen == url) {
                urls.push(url.to_owned());
            }
        }
        urls
    }
}

/// Keeps URLs whose uppercased form contains the product name with spaces
/// turned into underscores, or with spaces removed.
#[must_use]
pub fn filter_own_name(urls: &[String], product_name: &str) -> Vec<String> {
    let name_upper = product_name.trim().to_uppercase();
    let underscored = name_upper.replace(' ', "_");
    let collapsed = name_upper.replace(' ', "");

    urls.iter()
        .filter(|url| {
            let upper = url.to_uppercase();
            upper.contains(&underscored) || upper.contains(&collapsed)
        })
        .cloned()
        .collect()
}

/// Keeps URLs containing the product name's first word (uppercased).
///
/// Returns nothing when the first word is shorter than four characters;
/// short words match too many unrelated products.
#[must_use]
pub fn filter_first_word(urls: &[String], product_name: &str) -> Vec<String> {
    let Some(first) = product_name.split_whitespace().next() else {
        return Vec::new();
    };
    let first = first.to_uppercase();
    if first.chars().count() < MIN_PARTIAL_WORD_CHARS {
        return Vec::new();
    }

    urls.iter()
        .filter(|url| url.to_uppercase().contains(&first))
        .cloned()
        .collect()
}
