//! Post-processing outputs
//!
//! Independent, non-interacting writers over the exported capture
//! partitions: the ranked list (every capture, classified) and the WARC
//! download list (successful robots.txt-like captures only). Both read all
//! redirect rounds of one crawl and deduplicate exactly, because following
//! every redirect leaves duplicate rows in the capture table.

mod download;
mod ranked;

pub use download::write_download_list;
pub use ranked::write_ranked_list;

use crate::capture::{self, CaptureRow};
use crate::columnar;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("No capture partitions for crawl {crawl} under {location}")]
    MissingCaptures { crawl: String, location: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Reads every redirect round of one crawl's capture table, in depth order.
pub(crate) fn collect_crawl_captures(
    table_location: &str,
    crawl: &str,
) -> crate::Result<Vec<CaptureRow>> {
    let dir = capture::crawl_dir(table_location, crawl);
    if !dir.is_dir() {
        return Err(OutputError::MissingCaptures {
            crawl: crawl.to_string(),
            location: table_location.to_string(),
        }
        .into());
    }

    let mut partitions: Vec<(u32, PathBuf)> = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(depth) = name.strip_prefix("redirects=") else {
            continue;
        };
        let Ok(depth) = depth.parse::<u32>() else {
            continue;
        };
        partitions.push((depth, path));
    }
    partitions.sort();

    let mut rows = Vec::new();
    for (_, partition) in partitions {
        rows.extend(columnar::read_captures_dir(&partition)?);
    }
    Ok(rows)
}
