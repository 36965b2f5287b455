//! Ranking of marker-tagged URLs found on a product page.

use std::sync::LazyLock;

use regex::Regex;

use super::markup::MarkerPatterns;

static RESIZED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-\d+x\d+\.").expect("valid resize regex"));

/// Score adjustments applied to each candidate URL.
///
/// Tuned to the site's current WordPress naming; adjust here rather than
/// in the control flow if the upload conventions change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    /// Marker not followed by a digit, or directly before the extension.
    pub exact_marker: i32,
    /// Marker followed by a hyphen suffix (`_C1-1`, `_C1-e123`).
    pub marker_suffix: i32,
    /// Subtracted for WordPress resize suffixes such as `-1024x512.`.
    pub resized_penalty: i32,
    /// No doubled `/` in the path.
    pub clean_path: i32,
    pub jpeg: i32,
    pub webp: i32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            exact_marker: 100,
            marker_suffix: 90,
            resized_penalty: 50,
            clean_path: 10,
            jpeg: 5,
            webp: 3,
        }
    }
}

/// Scores one URL. Higher is better.
#[must_use]
pub fn score_url(url: &str, patterns: &MarkerPatterns, weights: &ScoreWeights) -> i32 {
    let mut score = 0;

    if patterns.exact.is_match(url) || patterns.before_extension.is_match(url) {
        score += weights.exact_marker;
    } else if patterns.suffixed.is_match(url) {
        score += weights.marker_suffix;
    }

    if RESIZED_RE.is_match(url) {
        score -= weights.resized_penalty;
    }

    let without_scheme = url.replace("https://", "").replace("http://", "");
    if !without_scheme.contains("//") {
        score += weights.clean_path;
    }

    let lower = url.to_ascii_lowercase();
    if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
        score += weights.jpeg;
    } else if lower.ends_with(".webp") {
        score += weights.webp;
    }

    score
}

/// Picks the highest-scoring URL; ties go to the earliest one.
#[must_use]
pub fn best_candidate(
    urls: &[String],
    patterns: &MarkerPatterns,
    weights: &ScoreWeights,
) -> Option<(String, i32)> {
    let mut best: Option<(&String, i32)> = None;
    for url in urls {
        let score = score_url(url, patterns, weights);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((url, score));
        }
    }
    best.map(|(url, score)| (url.clone(), score))
}
