//! Ripple-Fetch: a bounded, retrying image harvester
//!
//! This crate fetches a web page, extracts the images it references, and
//! downloads them concurrently under a fixed concurrency ceiling, retrying
//! transient timeouts with exponential backoff and isolating task panics.

pub mod config;
pub mod download;
pub mod page;
pub mod pipeline;
pub mod pool;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Fetch operations
#[derive(Debug, Error)]
pub enum RippleError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Fetch page {url}: invalid status {status}")]
    PageStatus { url: String, status: u16 },

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download of {reference} failed: {source}")]
    Task {
        reference: String,
        source: download::TaskError,
    },

    #[error("Task for {reference} panicked: {message}")]
    TaskPanicked { reference: String, message: String },

    #[error("Pipeline was cancelled before all downloads finished")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Ripple-Fetch operations
pub type Result<T> = std::result::Result<T, RippleError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use download::{BackoffPolicy, DownloadTask, Downloader, TaskError};
pub use pipeline::Pipeline;
pub use pool::{FailurePolicy, PoolConfig, PoolReport, TaskOutcome, TaskPool};
pub use url::{locate, resolve_reference, ResolvedTarget};
