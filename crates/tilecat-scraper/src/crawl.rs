//! Product page crawler: attribute and image extraction from catalog pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tilecat_core::products::SKU_PREFIX;
use tilecat_core::{CrawledProduct, SeedProduct};

use crate::oracle::PageSource;
use crate::resolver::construct::product_page_url;

const GENERATED_SKU_NAME_CHARS: usize = 15;

/// Primary-image selectors, most specific first. A `img[src*="{host}"]`
/// selector is inserted after `img[src*="producto"]` at parse time.
const PRIMARY_IMAGE_CSS: [&str; 6] = [
    "img.wp-post-image",
    ".product-image img",
    ".woocommerce-product-gallery img",
    r#"img[src*="producto"]"#,
    ".elementor-widget-image img",
    "figure img",
];

/// Class name fragments of blocks holding `key: value` spec lines.
const SPEC_BLOCK_CLASS_HINTS: [&str; 3] = ["spec", "detail", "caracteristica"];

static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static IMG: LazyLock<Selector> = LazyLock::new(|| Selector::parse("img").expect("valid selector"));
static TABLE_ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table tr").expect("valid selector"));
static CELL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").expect("valid selector"));
static SPEC_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div[class], ul[class], dl[class]").expect("valid selector"));

static PRODUCT_SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/producto/([^/]+)/").expect("valid slug regex"));
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));
static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\d.]+").expect("valid regex"));

/// Extracts the product slug from a product page URL.
///
/// Recognizes `/producto/{slug}/`; otherwise falls back to the last
/// non-empty path segment.
#[must_use]
pub fn slug_from_url(url: &str) -> Option<String> {
    if let Some(caps) = PRODUCT_SLUG_RE.captures(url) {
        return caps.get(1).map(|m| m.as_str().to_owned());
    }
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let (_host, path) = rest.split_once('/')?;
    path.split('/')
        .rfind(|segment| !segment.is_empty())
        .map(str::to_owned)
}

/// Parses one product page into a [`CrawledProduct`].
///
/// `host_token` is the site's name as it appears in asset URLs (see
/// [`crate::client::site_token`]); image sources must contain it or
/// `wp-content` to count.
#[must_use]
pub fn parse_product_page(url: &str, html: &str, host_token: &str) -> CrawledProduct {
    let doc = Html::parse_document(html);
    let mut product = CrawledProduct {
        slug: slug_from_url(url).unwrap_or_default(),
        url: url.to_owned(),
        ..CrawledProduct::default()
    };

    product.name = doc
        .select(&H1)
        .next()
        .map(|h1| element_text(&h1))
        .filter(|name| !name.is_empty());

    product.image_url = primary_image(&doc, host_token);
    product.images = product_images(&doc, host_token);

    for row in doc.select(&TABLE_ROW) {
        let cells: Vec<ElementRef<'_>> = row.select(&CELL).collect();
        if cells.len() < 2 {
            continue;
        }
        let key = element_text(&cells[0]).to_lowercase();
        let value = element_text(&cells[1]);
        product.specs.insert(key.clone(), value.clone());
        apply_spec(&mut product, &key, value);
    }

    collect_spec_blocks(&doc, &mut product.specs);

    if product.sku.is_none() {
        product.sku = product.name.as_deref().map(generated_sku);
    }
    product
}

/// Maps a spec-table row onto the matching typed field, first match wins.
fn apply_spec(product: &mut CrawledProduct, key: &str, value: String) {
    let has = |needle: &str| key.contains(needle);

    if has("formato") || has("size") {
        product.format = Some(value);
    } else if has("sku") || has("código") || has("codigo") {
        product.sku = Some(value);
    } else if has("acabado") || has("finish") {
        product.finish = Some(value);
    } else if has("tipo") || has("type") {
        product.tile_type = Some(value);
    } else if has("uso") || has("usage") {
        product.usage = Some(value);
    } else if has("piezas") {
        if let Some(pieces) = INTEGER_RE
            .find(&value)
            .and_then(|m| m.as_str().parse::<i64>().ok())
        {
            product.pieces_per_box = Some(pieces);
        }
    } else if has("m2") || has("m²") || has("metros") {
        if let Some(sqm) = DECIMAL_RE
            .find(&value)
            .and_then(|m| m.as_str().parse::<f64>().ok())
        {
            product.sqm_per_box = Some(sqm);
        }
    }
}

/// Reads `key: value` lines from blocks whose class hints at specifications.
fn collect_spec_blocks(doc: &Html, specs: &mut BTreeMap<String, String>) {
    for block in doc.select(&SPEC_BLOCK) {
        let class = block.value().attr("class").unwrap_or_default().to_lowercase();
        if !SPEC_BLOCK_CLASS_HINTS.iter().any(|hint| class.contains(hint)) {
            continue;
        }

        let text = block.text().collect::<Vec<_>>().join("\n");
        for line in text.lines() {
            let Some((key, value)) = line.trim().split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();
            if !key.is_empty() && !value.is_empty() {
                specs.insert(key, value.to_owned());
            }
        }
    }
}

fn primary_image(doc: &Html, host_token: &str) -> Option<String> {
    let host_css = format!(r#"img[src*="{host_token}"]"#);
    let host_selector = Selector::parse(&host_css).ok();
    if host_selector.is_none() {
        tracing::debug!(host_token, "host token does not form a valid selector");
    }

    let mut selectors: Vec<Selector> = PRIMARY_IMAGE_CSS
        .iter()
        .filter_map(|css| Selector::parse(css).ok())
        .collect();
    if let Some(selector) = host_selector {
        selectors.insert(4, selector);
    }

    for selector in &selectors {
        let Some(img) = doc.select(selector).next() else {
            continue;
        };
        if let Some(src) = image_source(&img).filter(|src| is_site_asset(src, host_token)) {
            return Some(src.to_owned());
        }
    }
    None
}

fn product_images(doc: &Html, host_token: &str) -> Vec<String> {
    let mut images: Vec<String> = Vec::new();
    for img in doc.select(&IMG) {
        let Some(src) = image_source(&img) else {
            continue;
        };
        if is_site_asset(src, host_token)
            && src.to_lowercase().contains("producto")
            && !images.iter().any(|seen| seen == src)
        {
            images.push(src.to_owned());
        }
    }
    images
}

/// First non-empty of `src`, `data-src`, `data-lazy-src`.
fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    ["src", "data-src", "data-lazy-src"]
        .into_iter()
        .filter_map(|attr| img.value().attr(attr))
        .find(|value| !value.is_empty())
}

fn is_site_asset(src: &str, host_token: &str) -> bool {
    (!host_token.is_empty() && src.contains(host_token)) || src.contains("wp-content")
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

fn generated_sku(name: &str) -> String {
    let stem: String = name
        .to_uppercase()
        .replace(' ', "-")
        .chars()
        .take(GENERATED_SKU_NAME_CHARS)
        .collect();
    format!("{SKU_PREFIX}{stem}")
}

/// Outcome of a crawl over the seed catalog.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub products: Vec<CrawledProduct>,
    /// Page URLs that could not be fetched.
    pub failed: Vec<String>,
}

/// Fetches and parses each seed product's page in order, pausing `delay`
/// between pages. A seed's `name` fills in for a page without an `<h1>`.
/// Unreachable pages are listed in [`CrawlReport::failed`] and never abort
/// the crawl.
pub async fn crawl_catalog<S: PageSource>(
    pages: &S,
    product_url_template: &str,
    seeds: &[SeedProduct],
    host_token: &str,
    delay: Duration,
) -> CrawlReport {
    let mut report = CrawlReport::default();
    let total = seeds.len();

    for (index, seed) in seeds.iter().enumerate() {
        let url = product_page_url(product_url_template, &seed.slug);
        match pages.fetch_page(&url).await {
            Some(html) => {
                let mut product = parse_product_page(&url, &html, host_token);
                if product.name.is_none() {
                    product.name = seed.name.clone().filter(|name| !name.trim().is_empty());
                    if product.sku.is_none() {
                        product.sku = product.name.as_deref().map(generated_sku);
                    }
                }
                tracing::info!(
                    position = index + 1,
                    of = total,
                    slug = %seed.slug,
                    name = product.name.as_deref().unwrap_or("-"),
                    "crawled product page"
                );
                report.products.push(product);
            }
            None => {
                tracing::warn!(position = index + 1, of = total, url = %url, "product page unavailable");
                report.failed.push(url);
            }
        }

        if index + 1 < total && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    report
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
