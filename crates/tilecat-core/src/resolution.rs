//! Close-up image resolution outcomes and the exchange document they are
//! written to.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::products::UnresolvedProduct;

/// The resolution strategy that produced a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    MarkupScrape,
    ConstructedProbe,
    AltSlugScrape,
    PartialMatchScrape,
    ParentNameProbe,
}

impl std::fmt::Display for CandidateOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateOrigin::MarkupScrape => write!(f, "page scrape"),
            CandidateOrigin::ConstructedProbe => write!(f, "URL probe"),
            CandidateOrigin::AltSlugScrape => write!(f, "alt slug scrape"),
            CandidateOrigin::PartialMatchScrape => write!(f, "partial match"),
            CandidateOrigin::ParentNameProbe => write!(f, "parent name probe"),
        }
    }
}

/// A resolved close-up image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageCandidate {
    pub url: String,
    pub origin: CandidateOrigin,
    /// Ranking score; only comparable between candidates from the same page.
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Resolved(ImageCandidate),
    Unresolved(UnresolvedProduct),
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to access report file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("report file {path} is not valid JSON: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a close-up resolution run.
///
/// `resolved` maps product id to image URL and is what the ingestion step
/// reads back; `unresolved` lists products left for manual follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    pub generated_at: DateTime<Utc>,
    /// Products returned by the catalog source.
    pub total_products: usize,
    /// Products skipped because their gallery already had a close-up.
    pub already_had_marker: usize,
    pub resolved: BTreeMap<String, String>,
    #[serde(default)]
    pub unresolved: Vec<UnresolvedProduct>,
}

impl ResolutionReport {
    #[must_use]
    pub fn new(total_products: usize, already_had_marker: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            total_products,
            already_had_marker,
            resolved: BTreeMap::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn record(&mut self, product_id: &str, result: ResolutionResult) {
        match result {
            ResolutionResult::Resolved(candidate) => {
                self.resolved.insert(product_id.to_string(), candidate.url);
            }
            ResolutionResult::Unresolved(product) => self.unresolved.push(product),
        }
    }

    /// Number of products the resolver actually searched for.
    #[must_use]
    pub fn searched(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    /// Writes the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReportError> {
        let body = serde_json::to_string_pretty(self).map_err(|e| ReportError::Json {
            path: path.display().to_string(),
            source: e,
        })?;
        std::fs::write(path, body + "\n").map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Reads a report previously written by [`Self::save`].
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let body = std::fs::read_to_string(path).map_err(|e| ReportError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        serde_json::from_str(&body).map_err(|e| ReportError::Json {
            path: path.display().to_string(),
            source: e,
        })
    }
}
