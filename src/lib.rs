//! robotstxt-captures: extraction of robots.txt capture records from
//! Common Crawl's robots.txt dataset.
//!
//! This crate queries a SQL table store for robots.txt fetch records keyed
//! to a ranked host list, follows HTTP redirect chains across successive
//! query rounds, and post-processes the exported capture partitions into a
//! ranked list and a WARC download list.

pub mod capture;
pub mod classify;
pub mod columnar;
pub mod config;
pub mod follow;
pub mod output;
pub mod ranks;
pub mod store;

use thiserror::Error;

/// Main error type for capture-extraction operations
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Columnar I/O error: {0}")]
    Columnar(#[from] columnar::ColumnarError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Rank combination error: {0}")]
    Rank(#[from] ranks::RankError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid crawl identifier: {0}")]
    InvalidCrawl(String),
}

/// Result type alias for capture-extraction operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use capture::{CaptureRow, PartitionLayout, RankedRecord, RedirectEdge};
pub use classify::{classify_fetch_status, is_robotstxt_mime_type, FetchStatusClass};
pub use follow::{follow_crawl, FollowSummary};
pub use store::{QueryInfo, SqliteStore, TableStore};
