//! Close-up image resolution.
//!
//! For each product lacking a marker image, the [`Resolver`] runs five
//! strategies in a fixed order and stops at the first one that yields a URL:
//!
//! 1. scrape the product page for marker images carrying the product name;
//! 2. probe URLs constructed from the name and format under the uploads path;
//! 3. scrape a page at a slug derived from the name, if it differs;
//! 4. re-scrape the product page matching only the first word of the name;
//! 5. for slug-less variant products (`… Malla`, `… Paver`), probe URLs
//!    constructed from the parent product's name.
//!
//! All network access goes through [`PageSource`] and [`ExistenceProbe`];
//! pacing goes through [`Pacer`].

pub mod construct;
pub mod markup;
pub mod pacing;
pub mod score;

use futures::stream::{self, StreamExt};
use tilecat_core::{
    AppConfig, CandidateOrigin, ImageCandidate, ProductRecord, ResolutionReport, ResolutionResult,
};

use crate::error::ScraperError;
use crate::oracle::{ExistenceProbe, PageSource};

use construct::{
    alternate_slug, constructed_candidates, parent_name, product_page_url,
    DEFAULT_VARIANT_SUFFIXES,
};
use markup::{filter_first_word, filter_own_name, MarkerPatterns};
use pacing::Pacer;
use score::{best_candidate, ScoreWeights};

/// Site conventions the resolver builds URLs from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    /// Absolute product page URL containing a `{slug}` placeholder.
    pub product_url_template: String,
    /// Absolute uploads directory URL ending in `/`.
    pub uploads_base_url: String,
    /// Close-up marker token, e.g. `_C1`.
    pub marker: String,
    /// Trailing name words that mark a variant of a parent product.
    pub variant_suffixes: Vec<String>,
    pub weights: ScoreWeights,
}

impl ResolverSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            product_url_template: config.product_url_template(),
            uploads_base_url: config.uploads_base_url(),
            marker: config.marker_token.clone(),
            variant_suffixes: DEFAULT_VARIANT_SUFFIXES
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            weights: ScoreWeights::default(),
        }
    }
}

/// Resolution strategies, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    MarkupScrape,
    ConstructedProbe,
    AltSlugScrape,
    PartialMatchScrape,
    ParentNameProbe,
}

impl Strategy {
    pub const ORDER: [Strategy; 5] = [
        Strategy::MarkupScrape,
        Strategy::ConstructedProbe,
        Strategy::AltSlugScrape,
        Strategy::PartialMatchScrape,
        Strategy::ParentNameProbe,
    ];

    #[must_use]
    pub fn origin(self) -> CandidateOrigin {
        match self {
            Strategy::MarkupScrape => CandidateOrigin::MarkupScrape,
            Strategy::ConstructedProbe => CandidateOrigin::ConstructedProbe,
            Strategy::AltSlugScrape => CandidateOrigin::AltSlugScrape,
            Strategy::PartialMatchScrape => CandidateOrigin::PartialMatchScrape,
            Strategy::ParentNameProbe => CandidateOrigin::ParentNameProbe,
        }
    }
}

/// Name filter applied to marker URLs found on a page.
#[derive(Debug, Clone, Copy)]
enum NameFilter {
    FullName,
    FirstWord,
}

pub struct Resolver<S, P, Z> {
    pages: S,
    probe: P,
    pacer: Z,
    settings: ResolverSettings,
    patterns: MarkerPatterns,
}

impl<S, P, Z> Resolver<S, P, Z>
where
    S: PageSource,
    P: ExistenceProbe,
    Z: Pacer,
{
    /// # Errors
    ///
    /// Returns [`ScraperError::Pattern`] if the marker cannot be compiled
    /// into the extraction patterns.
    pub fn new(pages: S, probe: P, pacer: Z, settings: ResolverSettings) -> Result<Self, ScraperError> {
        let patterns = MarkerPatterns::new(&settings.marker)?;
        Ok(Self {
            pages,
            probe,
            pacer,
            settings,
            patterns,
        })
    }

    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Finds the best close-up for `product`, or `None` when every strategy
    /// comes up empty.
    pub async fn resolve(&self, product: &ProductRecord) -> Option<ImageCandidate> {
        for strategy in Strategy::ORDER {
            if let Some(candidate) = self.run(strategy, product).await {
                return Some(candidate);
            }
        }
        None
    }

    /// Runs a single strategy against `product`.
    pub async fn run(&self, strategy: Strategy, product: &ProductRecord) -> Option<ImageCandidate> {
        let origin = strategy.origin();
        let found = match strategy {
            Strategy::MarkupScrape => {
                let slug = product.slug.as_deref()?;
                self.scrape(slug, &product.name, NameFilter::FullName, origin)
                    .await
            }
            Strategy::ConstructedProbe => {
                self.probe_constructed(&product.name, product.format.as_deref(), origin)
                    .await
            }
            Strategy::AltSlugScrape => {
                let slug = product.slug.as_deref()?;
                let alt = alternate_slug(&product.name);
                if alt.is_empty() || alt == slug {
                    return None;
                }
                self.scrape(&alt, &product.name, NameFilter::FullName, origin)
                    .await
            }
            Strategy::PartialMatchScrape => {
                let slug = product.slug.as_deref()?;
                self.scrape(slug, &product.name, NameFilter::FirstWord, origin)
                    .await
            }
            Strategy::ParentNameProbe => {
                if product.slug.is_some() {
                    return None;
                }
                let parent = parent_name(&product.name, &self.settings.variant_suffixes)?;
                tracing::debug!(product = %product.name, parent = %parent, "trying parent product name");
                self.probe_constructed(&parent, product.format.as_deref(), origin)
                    .await
            }
        };

        if let Some(candidate) = &found {
            tracing::debug!(
                product_id = %product.id,
                origin = %candidate.origin,
                url = %candidate.url,
                score = candidate.score,
                "close-up found"
            );
        }
        found
    }

    async fn scrape(
        &self,
        slug: &str,
        name: &str,
        filter: NameFilter,
        origin: CandidateOrigin,
    ) -> Option<ImageCandidate> {
        let url = product_page_url(&self.settings.product_url_template, slug);
        let html = self.pages.fetch_page(&url).await?;

        let tagged = self.patterns.extract_tagged_urls(&html);
        let matching = match filter {
            NameFilter::FullName => filter_own_name(&tagged, name),
            NameFilter::FirstWord => filter_first_word(&tagged, name),
        };
        tracing::trace!(
            page = %url,
            tagged = tagged.len(),
            matching = matching.len(),
            "scanned page for marker images"
        );

        let (url, score) = best_candidate(&matching, &self.patterns, &self.settings.weights)?;
        Some(ImageCandidate { url, origin, score })
    }

    async fn probe_constructed(
        &self,
        name: &str,
        format: Option<&str>,
        origin: CandidateOrigin,
    ) -> Option<ImageCandidate> {
        let candidates = constructed_candidates(
            &self.settings.uploads_base_url,
            name,
            format,
            &self.settings.marker,
        );
        for url in candidates {
            if self.probe.exists(&url).await {
                return Some(ImageCandidate {
                    url,
                    origin,
                    score: 0,
                });
            }
            self.pacer.between_probes().await;
        }
        None
    }

    /// Resolves every product whose gallery lacks the marker.
    ///
    /// Up to `concurrency` products are in flight at once; each product
    /// still runs its strategies in order, and the report lists outcomes in
    /// input order.
    pub async fn resolve_all(&self, products: &[ProductRecord], concurrency: usize) -> ResolutionReport {
        let (with_marker, pending): (Vec<&ProductRecord>, Vec<&ProductRecord>) = products
            .iter()
            .partition(|p| p.has_marker_image(&self.settings.marker));

        let mut report = ResolutionReport::new(products.len(), with_marker.len());
        let searched = pending.len();
        tracing::info!(
            total = products.len(),
            already_had_marker = with_marker.len(),
            searching = searched,
            "resolving close-up images"
        );

        let outcomes = stream::iter(pending.into_iter().enumerate().map(|(index, product)| async move {
            tracing::info!(
                position = index + 1,
                of = searched,
                product_id = %product.id,
                name = %product.name,
                slug = product.slug.as_deref().unwrap_or("-"),
                format = product.format.as_deref().unwrap_or("-"),
                "resolving"
            );
            let result = match self.resolve(product).await {
                Some(candidate) => {
                    tracing::info!(product_id = %product.id, origin = %candidate.origin, url = %candidate.url, "found");
                    ResolutionResult::Resolved(candidate)
                }
                None => {
                    tracing::info!(product_id = %product.id, "not found");
                    ResolutionResult::Unresolved(product.unresolved())
                }
            };
            self.pacer.between_products().await;
            (product.id.clone(), result)
        }))
        .buffered(concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

        for (product_id, result) in outcomes {
            report.record(&product_id, result);
        }
        report
    }
}

#[cfg(test)]
#[path = "../resolver_test.rs"]
mod tests;
