//! Network seams consulted by the resolver.
//!
//! The resolver never talks to `reqwest` directly; it asks a [`PageSource`]
//! for markup and an [`ExistenceProbe`] whether a URL exists. Both answer
//! with plain values, so every transport failure has already been folded
//! into "absent" or "does not exist" by the time the resolver sees it.

use std::future::Future;

/// Fetches raw page markup.
pub trait PageSource: Sync {
    /// Returns the page body, or `None` on any transport failure, timeout,
    /// or non-success status.
    fn fetch_page(&self, url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Lightweight remote existence check.
pub trait ExistenceProbe: Sync {
    /// Returns `true` only when the server confirms the resource exists.
    fn exists(&self, url: &str) -> impl Future<Output = bool> + Send;
}

impl<T: PageSource> PageSource for &T {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Option<String>> + Send {
        (**self).fetch_page(url)
    }
}

impl<T: ExistenceProbe> ExistenceProbe for &T {
    fn exists(&self, url: &str) -> impl Future<Output = bool> + Send {
        (**self).exists(url)
    }
}
