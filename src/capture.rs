//! Capture records and partition layout
//!
//! Data model shared by the store, the redirect follower and the
//! post-processing writers: one robots.txt fetch result, one flattened
//! redirect edge, one ranked-list record, plus the helpers that map
//! (crawl, redirect depth) to partition paths.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// One robots.txt fetch result, as exported for a single round.
///
/// Rows for round 0 come from the ranked host list lookup and carry `None`
/// in the `from_*` fields; rows for later rounds come from a redirect join
/// and record where the redirect chain arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRow {
    /// Host from the ranked host list
    pub host: String,

    /// Registered domain from the ranked host list
    pub domain: String,

    /// Rank of the host
    pub rank: i32,

    /// The original /robots.txt URL the chain started from
    pub orig_url: String,

    /// Host name of the captured URL (as recorded by the crawler)
    pub url_host_name: Option<String>,

    /// The captured URL of this round
    pub url: String,

    /// Fetch time of the capture
    pub fetch_time: DateTime<Utc>,

    /// HTTP fetch status
    pub fetch_status: i32,

    /// WARC file holding the record
    pub warc_filename: String,

    /// Byte offset of the record in the WARC file
    pub warc_record_offset: i64,

    /// Length of the record in bytes
    pub warc_record_length: i32,

    /// Redirect target observed by the crawler, if any
    pub fetch_redirect: Option<String>,

    /// MIME type declared in the Content-Type header
    pub content_mime_type: Option<String>,

    /// MIME type detected from the content
    pub content_mime_detected: Option<String>,

    /// URL that redirected here (rounds >= 1)
    pub from_url: Option<String>,

    /// Fetch status of the redirecting capture (rounds >= 1)
    pub from_fetch_status: Option<i32>,

    /// Whether the redirecting capture stayed on the same host (rounds >= 1)
    pub from_to_is_same_host: Option<bool>,
}

/// One flattened redirect edge, persisted as the next round's input table.
///
/// Multiple origins may redirect to the same target; every origin keeps its
/// own edge so the full chain from the original /robots.txt URL to the
/// final location can be reconstructed later for WARC deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectEdge {
    pub host: String,
    pub domain: String,
    pub rank: i32,
    pub orig_url: String,
    pub from_url: String,
    pub from_fetch_status: i32,
    pub from_to_is_same_host: bool,
    pub to_url: String,
}

/// One row of the ranked list artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RankedRecord {
    pub host: String,
    pub domain: String,
    pub rank: i32,
    pub url: String,
    pub fetch_status: i32,
    pub fetch_redirect: Option<String>,
    pub content_mime_type: Option<String>,
    pub content_mime_detected: Option<String>,
    pub robotstxt_fetch_status: String,
    pub is_robotstxt_mime_type: bool,
}

/// Locations of the exported capture partitions and the frontier tables.
///
/// Both locations are laid out as `crawl=<crawl>/redirects=<depth>/`
/// partition directories, so a table store can discover new partitions by
/// scanning the directory tree.
#[derive(Debug, Clone)]
pub struct PartitionLayout {
    /// Location holding the exported capture partitions
    pub output_location: String,

    /// Location holding the redirect target tables required for the joins
    /// when following redirects
    pub redirect_target_location: String,
}

impl PartitionLayout {
    pub fn new(output_location: &str, redirect_target_location: &str) -> Self {
        Self {
            output_location: output_location.trim_end_matches('/').to_string(),
            redirect_target_location: redirect_target_location.trim_end_matches('/').to_string(),
        }
    }

    /// Directory of the capture partition for one (crawl, depth)
    pub fn capture_partition(&self, crawl: &str, depth: u32) -> PathBuf {
        partition_dir(&self.output_location, crawl, depth)
    }

    /// File the store writes one round's captures to
    pub fn capture_file(&self, crawl: &str, depth: u32) -> PathBuf {
        self.capture_partition(crawl, depth)
            .join(format!("captures-{depth}-{crawl}.zstd.parquet"))
    }

    /// Directory of the frontier partition for one (crawl, depth)
    pub fn frontier_partition(&self, crawl: &str, depth: u32) -> PathBuf {
        partition_dir(&self.redirect_target_location, crawl, depth)
    }

    /// File the frontier builder writes one round's redirect targets to
    pub fn frontier_file(&self, crawl: &str, depth: u32) -> PathBuf {
        self.frontier_partition(crawl, depth)
            .join(format!("redirects-to-follow-{depth}-{crawl}.zstd.parquet"))
    }
}

/// `<location>/crawl=<crawl>/redirects=<depth>/`
pub fn partition_dir(location: &str, crawl: &str, depth: u32) -> PathBuf {
    Path::new(location)
        .join(format!("crawl={crawl}"))
        .join(format!("redirects={depth}"))
}

/// `<location>/crawl=<crawl>/`
pub fn crawl_dir(location: &str, crawl: &str) -> PathBuf {
    Path::new(location).join(format!("crawl={crawl}"))
}
