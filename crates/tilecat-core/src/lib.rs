pub mod app_config;
pub mod catalog;
pub mod config;
pub mod products;
pub mod resolution;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, CatalogFile, SeedProduct};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{CrawledProduct, Gallery, ProductRecord, UnresolvedProduct};
pub use resolution::{CandidateOrigin, ImageCandidate, ReportError, ResolutionReport, ResolutionResult};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}
