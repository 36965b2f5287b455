//! Host extraction helpers for the site client and crawler.

/// Extracts the hostname from a URL for use in error messages.
///
/// Falls back to the full URL string if parsing fails.
pub(crate) fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}

/// Returns the brand label of a site, e.g. `"cesantoni"` for
/// `"https://www.cesantoni.com.mx"`. Asset URLs on the site's CDN usually
/// carry this label even when the host differs.
#[must_use]
pub fn site_token(base_url: &str) -> String {
    let host = extract_domain(base_url);
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host.split('.').next().unwrap_or(host).to_ascii_lowercase()
}
