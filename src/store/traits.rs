//! Table store trait and error types
//!
//! The redirect-following loop talks to the query backend through this
//! narrow interface, so the loop logic can be driven by a fake in-memory
//! store in tests.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Columnar I/O error: {0}")]
    Columnar(#[from] crate::columnar::ColumnarError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized partition path: {0}")]
    InvalidPartitionPath(PathBuf),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Metadata of one executed query job.
///
/// Mirrors what the query backend reports: terminal state, rows the job
/// exported or loaded, and wall-clock execution time.
#[derive(Debug, Clone)]
pub struct QueryInfo {
    /// Terminal job state
    pub state: String,

    /// Rows exported (materialization) or loaded (partition refresh)
    pub rows: u64,

    /// Wall-clock execution time
    pub elapsed: Duration,
}

impl QueryInfo {
    pub fn succeeded(rows: u64, elapsed: Duration) -> Self {
        Self {
            state: "SUCCEEDED".to_string(),
            rows,
            elapsed,
        }
    }
}

/// Narrow interface to the query backend.
///
/// Two operations are all the redirect-following loop needs: materialize
/// one round's capture partition, and make newly written frontier
/// partitions visible to subsequent queries.
pub trait TableStore {
    /// Materializes round `depth`'s capture partition for `crawl`.
    ///
    /// Round 0 selects the latest robots.txt capture per URL for the ranked
    /// host list; later rounds select the latest capture per (origin host,
    /// URL) joined against the round `depth - 1` frontier table.
    fn materialize_round(&mut self, crawl: &str, depth: u32) -> StoreResult<QueryInfo>;

    /// Makes frontier partitions written since the last call visible for
    /// querying.
    fn refresh_partitions(&mut self) -> StoreResult<QueryInfo>;
}
