//! Settings types for the pipeline commands

use crate::capture::PartitionLayout;
use crate::config::validation;
use crate::ConfigResult;
use std::path::PathBuf;

/// Settings of the capture extraction run
#[derive(Debug, Clone)]
pub struct CapturesSettings {
    /// Capture index database
    pub database: PathBuf,

    /// Locations of the capture partitions and frontier tables
    pub layout: PartitionLayout,

    /// Follow up to n redirects per crawl
    pub follow_redirects: u32,

    /// Crawl snapshots to process
    pub crawls: Vec<String>,
}

impl CapturesSettings {
    /// Builds and validates settings; locations are normalized on the way.
    pub fn new(
        database: PathBuf,
        output_location: &str,
        redirect_target_location: &str,
        follow_redirects: u32,
        crawls: Vec<String>,
    ) -> ConfigResult<Self> {
        let settings = Self {
            database,
            layout: PartitionLayout::new(output_location, redirect_target_location),
            follow_redirects,
            crawls,
        };
        validation::validate_captures(&settings)?;
        Ok(settings)
    }
}

/// Settings of the ranked-list and download-list writers
#[derive(Debug, Clone)]
pub struct ListSettings {
    /// Location of the exported capture table
    pub table_location: String,

    /// Output location for the list artifacts
    pub output_location: String,

    /// Crawl snapshots to process
    pub crawls: Vec<String>,
}

impl ListSettings {
    /// Builds and validates settings; locations are normalized on the way.
    pub fn new(
        table_location: &str,
        output_location: &str,
        crawls: Vec<String>,
    ) -> ConfigResult<Self> {
        let settings = Self {
            table_location: table_location.trim_end_matches('/').to_string(),
            output_location: output_location.trim_end_matches('/').to_string(),
            crawls,
        };
        validation::validate_lists(&settings)?;
        Ok(settings)
    }
}
