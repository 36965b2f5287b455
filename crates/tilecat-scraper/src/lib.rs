//! Catalog site access: the HTTP client, the product page crawler, and the
//! close-up image resolver.

pub mod client;
pub mod crawl;
pub mod error;
pub mod oracle;
mod rate_limit;
pub mod resolver;

pub use client::{site_token, SiteClient};
pub use crawl::{crawl_catalog, parse_product_page, slug_from_url, CrawlReport};
pub use error::ScraperError;
pub use oracle::{ExistenceProbe, PageSource};
pub use resolver::pacing::{FixedDelay, NoDelay, Pacer};
pub use resolver::score::ScoreWeights;
pub use resolver::{Resolver, ResolverSettings, Strategy};
