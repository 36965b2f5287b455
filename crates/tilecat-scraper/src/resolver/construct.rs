//! Deterministic URL construction: format normalization, name transforms,
//! alternate slugs, and parent names for variant products.

use std::sync::LazyLock;

use regex::Regex;
use tilecat_core::products::capitalize;

/// Extensions tried for every constructed stem, in probe order.
pub const IMAGE_EXTENSIONS: [&str; 4] = [".jpg", ".webp", ".png", ".jpeg"];

/// Trailing name words that mark a variant of a parent product.
pub const DEFAULT_VARIANT_SUFFIXES: [&str; 2] = ["Malla", "Paver"];

static X_SEPARATOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*x\s*").expect("valid separator regex"));
static CM_UNIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*cm\s*").expect("valid unit regex"));
static NON_SLUG_CHARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]").expect("valid slug regex"));
static REPEATED_HYPHENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("valid hyphen regex"));

/// Normalizes a declared format for use in a filename: `"20 x 120 cm"`
/// becomes `"20x120cm"`.
///
/// Returns `None` for absent or blank input. Idempotent.
#[must_use]
pub fn normalize_format(format: Option<&str>) -> Option<String> {
    let trimmed = format?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let joined = X_SEPARATOR_RE.replace_all(trimmed, "x");
    let unit = CM_UNIT_RE.replace_all(&joined, "cm");
    let normalized: String = unit.chars().filter(|c| *c != ' ').collect();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// The casing variants of a product name tried when constructing URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameForms {
    /// `BIANCO_QUARTZ`
    pub upper: String,
    /// `Bianco_Quartz`; `None` when identical to `upper`.
    pub title: Option<String>,
    /// The name as written with spaces turned into underscores; `None` when
    /// identical to an earlier form.
    pub original: Option<String>,
}

impl NameForms {
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let upper = name.to_uppercase().replace(' ', "_");
        let title = name
            .split_whitespace()
            .map(capitalize)
            .collect::<Vec<_>>()
            .join("_");
        let original = name.replace(' ', "_");

        let original = (original != upper && original != title).then_some(original);
        let title = (title != upper).then_some(title);
        Self {
            upper,
            title,
            original,
        }
    }

    /// Forms in probe order, duplicates already removed.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.upper.as_str())
            .chain(self.title.as_deref())
            .chain(self.original.as_deref())
    }
}

/// Builds the ordered list of upload URLs to probe for a product's close-up.
///
/// For the uppercase form the order is `NAME_FMT{marker}`, `NAME{marker}`,
/// then `NAME_FMT{marker}-1`; the title-case and original-casing forms
/// contribute `NAME_FMT{marker}` and `NAME{marker}` only. Each stem is tried
/// with every extension in [`IMAGE_EXTENSIONS`]. Stems that need a format
/// are skipped when the product has none.
#[must_use]
pub fn constructed_candidates(
    uploads_base: &str,
    name: &str,
    format: Option<&str>,
    marker: &str,
) -> Vec<String> {
    let forms = NameForms::from_name(name);
    let format = normalize_format(format);

    let mut stems: Vec<String> = Vec::new();
    if let Some(fmt) = &format {
        stems.push(format!("{}_{fmt}{marker}", forms.upper));
    }
    stems.push(format!("{}{marker}", forms.upper));
    if let Some(fmt) = &format {
        stems.push(format!("{}_{fmt}{marker}-1", forms.upper));
    }
    for form in forms.iter().skip(1) {
        if let Some(fmt) = &format {
            stems.push(format!("{form}_{fmt}{marker}"));
        }
        stems.push(format!("{form}{marker}"));
    }

    stems
        .iter()
        .flat_map(|stem| {
            IMAGE_EXTENSIONS
                .iter()
                .map(move |ext| format!("{uploads_base}{stem}{ext}"))
        })
        .collect()
}

/// Derives a slug from the product name: lowercase, hyphens for spaces,
/// only `[a-z0-9-]`, no repeated or edge hyphens.
#[must_use]
pub fn alternate_slug(name: &str) -> String {
    let lowered = name.trim().to_lowercase().replace(' ', "-");
    let stripped = NON_SLUG_CHARS_RE.replace_all(&lowered, "");
    let collapsed = REPEATED_HYPHENS_RE.replace_all(&stripped, "-");
    collapsed.trim_matches('-').to_owned()
}

/// Returns the parent product name when the last word of `name` is one of
/// `suffixes` and at least one word precedes it.
#[must_use]
pub fn parent_name(name: &str, suffixes: &[String]) -> Option<String> {
    let words: Vec<&str> = name.split_whitespace().collect();
    let (last, head) = words.split_last()?;
    if head.is_empty() || !suffixes.iter().any(|s| s == last) {
        return None;
    }
    Some(head.join(" "))
}

/// Substitutes `slug` into a product page URL template containing `{slug}`.
#[must_use]
pub fn product_page_url(template: &str, slug: &str) -> String {
    template.replace("{slug}", slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.cesantoni.com.mx/wp-content/uploads/";

    fn suffixes() -> Vec<String> {
        DEFAULT_VARIANT_SUFFIXES.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn normalize_format_spaced_uppercase_unit() {
        assert_eq!(normalize_format(Some("20 x 120 CM")).as_deref(), Some("20x120cm"));
    }

    #[test]
    fn normalize_format_is_idempotent() {
        let once = normalize_format(Some("20 x 120 CM")).unwrap();
        assert_eq!(normalize_format(Some(&once)).as_deref(), Some(once.as_str()));
        assert_eq!(normalize_format(Some("60X60cm")).as_deref(), Some("60x60cm"));
    }

    #[test]
    fn normalize_format_blank_is_none() {
        assert_eq!(normalize_format(None), None);
        assert_eq!(normalize_format(Some("   ")), None);
    }

    #[test]
    fn name_forms_skip_duplicates() {
        let forms = NameForms::from_name("ALPES");
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec!["ALPES", "Alpes"]);

        // Original casing equals the title form, so only two forms remain.
        let forms = NameForms::from_name("Alpes");
        assert_eq!(forms.original, None);
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec!["ALPES", "Alpes"]);

        let forms = NameForms::from_name("Bianco Quartz");
        assert_eq!(forms.iter().collect::<Vec<_>>(), vec!["BIANCO_QUARTZ", "Bianco_Quartz"]);

        let forms = NameForms::from_name("calacatta Black");
        assert_eq!(
            forms.iter().collect::<Vec<_>>(),
            vec!["CALACATTA_BLACK", "Calacatta_Black", "calacatta_Black"]
        );
    }

    #[test]
    fn title_form_lowercases_word_tails() {
        let forms = NameForms::from_name("MARMOL blanco");
        assert_eq!(forms.title.as_deref(), Some("Marmol_Blanco"));
    }

    #[test]
    fn candidates_with_format_in_probe_order() {
        let urls = constructed_candidates(BASE, "Bianco Quartz", Some("60 x 120 cm"), "_C1");
        // 3 upper stems + 2 title stems, 4 extensions each.
        assert_eq!(urls.len(), 20);
        assert_eq!(urls[0], format!("{BASE}BIANCO_QUARTZ_60x120cm_C1.jpg"));
        assert_eq!(urls[1], format!("{BASE}BIANCO_QUARTZ_60x120cm_C1.webp"));
        assert_eq!(urls[4], format!("{BASE}BIANCO_QUARTZ_C1.jpg"));
        assert_eq!(urls[8], format!("{BASE}BIANCO_QUARTZ_60x120cm_C1-1.jpg"));
        assert_eq!(urls[12], format!("{BASE}Bianco_Quartz_60x120cm_C1.jpg"));
        assert_eq!(urls[19], format!("{BASE}Bianco_Quartz_C1.jpeg"));
    }

    #[test]
    fn candidates_without_format_skip_format_stems() {
        let urls = constructed_candidates(BASE, "ALPES", None, "_C1");
        assert_eq!(
            urls,
            vec![
                format!("{BASE}ALPES_C1.jpg"),
                format!("{BASE}ALPES_C1.webp"),
                format!("{BASE}ALPES_C1.png"),
                format!("{BASE}ALPES_C1.jpeg"),
                format!("{BASE}Alpes_C1.jpg"),
                format!("{BASE}Alpes_C1.webp"),
                format!("{BASE}Alpes_C1.png"),
                format!("{BASE}Alpes_C1.jpeg"),
            ]
        );
    }

    #[test]
    fn candidates_use_configured_marker() {
        let urls = constructed_candidates(BASE, "ALPES", None, "_C2");
        assert_eq!(urls[0], format!("{BASE}ALPES_C2.jpg"));
    }

    #[test]
    fn alternate_slug_strips_accents_and_symbols() {
        assert_eq!(alternate_slug("Mármol  Blanco & Co."), "mrmol-blanco-co");
        assert_eq!(alternate_slug("  Sunset Maple "), "sunset-maple");
        assert_eq!(alternate_slug("Pietra 2.0"), "pietra-20");
    }

    #[test]
    fn alternate_slug_of_symbols_is_empty() {
        assert_eq!(alternate_slug("¡¿!"), "");
    }

    #[test]
    fn parent_name_strips_variant_suffix() {
        assert_eq!(parent_name("Alpes Malla", &suffixes()).as_deref(), Some("Alpes"));
        assert_eq!(
            parent_name("Cantera Gris Paver", &suffixes()).as_deref(),
            Some("Cantera Gris")
        );
    }

    #[test]
    fn parent_name_requires_known_suffix_and_parent() {
        assert_eq!(parent_name("Alpes", &suffixes()), None);
        assert_eq!(parent_name("Malla", &suffixes()), None);
        assert_eq!(parent_name("Alpes malla", &suffixes()), None);
        assert_eq!(parent_name("Alpes Beige", &suffixes()), None);
    }

    #[test]
    fn product_page_url_substitutes_slug() {
        assert_eq!(
            product_page_url("https://www.cesantoni.com.mx/producto/{slug}/", "alpes"),
            "https://www.cesantoni.com.mx/producto/alpes/"
        );
    }
}
