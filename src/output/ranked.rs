//! Ranked list of robots.txt capture statuses
//!
//! Extracts the list of hosts, their rank and robots.txt capture status
//! from the exported capture table of one crawl.

use crate::capture::{self, RankedRecord};
use crate::classify::{classify_fetch_status, is_robotstxt_mime_type, FetchStatusClass};
use crate::columnar;
use crate::output::collect_crawl_captures;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// Writes the ranked list artifact for one crawl and returns its path.
pub fn write_ranked_list(
    table_location: &str,
    output_location: &str,
    crawl: &str,
) -> crate::Result<PathBuf> {
    let rows = collect_crawl_captures(table_location, crawl)?;
    tracing::info!("{} robots.txt captures for crawl {}", rows.len(), crawl);

    let mut status_counts: BTreeMap<&'static str, u64> = BTreeMap::new();
    let mut other_statuses: BTreeMap<i32, u64> = BTreeMap::new();
    let mut mime_counts = [0u64; 2];

    let mut records: Vec<RankedRecord> = Vec::with_capacity(rows.len());
    for row in &rows {
        let class = classify_fetch_status(row.fetch_status);
        *status_counts.entry(class.as_str()).or_default() += 1;
        if class == FetchStatusClass::Other {
            *other_statuses.entry(row.fetch_status).or_default() += 1;
        }

        let is_robots = is_robotstxt_mime_type(
            row.content_mime_detected.as_deref(),
            row.content_mime_type.as_deref(),
        );
        mime_counts[usize::from(is_robots)] += 1;

        records.push(RankedRecord {
            host: row.host.clone(),
            domain: row.domain.clone(),
            rank: row.rank,
            url: row.url.clone(),
            fetch_status: row.fetch_status,
            fetch_redirect: row.fetch_redirect.clone(),
            content_mime_type: row.content_mime_type.clone(),
            content_mime_detected: row.content_mime_detected.clone(),
            robotstxt_fetch_status: class.as_str().to_string(),
            is_robotstxt_mime_type: is_robots,
        });
    }

    tracing::info!("Fetch status classification of robots.txt captures:");
    for (class, count) in &status_counts {
        tracing::info!("{:8}\t{}", count, class);
    }
    if !other_statuses.is_empty() {
        tracing::info!("Fetch status classified as \"other\":");
        for (status, count) in &other_statuses {
            tracing::info!("{:8}\t{}", count, status);
        }
    }
    tracing::info!("MIME type classification of robots.txt captures:");
    tracing::info!("{:8}\ttrue", mime_counts[1]);
    tracing::info!("{:8}\tfalse", mime_counts[0]);

    let n_rows = records.len();
    let mut unique = HashSet::with_capacity(n_rows);
    records.retain(|record| unique.insert(record.clone()));
    if records.len() < n_rows {
        tracing::info!(
            "Removed {} duplicates in ranked list",
            n_rows - records.len()
        );
    }

    let path = capture::crawl_dir(output_location, crawl)
        .join(format!("robotstxt-captures-{crawl}.zstd.parquet"));
    columnar::write_ranked(&path, &records)?;
    tracing::info!(
        "Ranked list of robots.txt captures saved to {}",
        path.display()
    );

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureRow, PartitionLayout};
    use chrono::{TimeZone, Utc};

    const CRAWL: &str = "CC-MAIN-2022-33";

    fn capture(url: &str, status: i32, detected: Option<&str>) -> CaptureRow {
        CaptureRow {
            host: "example.com".to_string(),
            domain: "example.com".to_string(),
            rank: 1,
            orig_url: "https://example.com/robots.txt".to_string(),
            url_host_name: Some("example.com".to_string()),
            url: url.to_string(),
            fetch_time: Utc.with_ymd_and_hms(2022, 8, 12, 10, 0, 0).unwrap(),
            fetch_status: status,
            warc_filename: "crawl-data/robotstxt.warc.gz".to_string(),
            warc_record_offset: 0,
            warc_record_length: 400,
            fetch_redirect: None,
            content_mime_type: Some("text/plain".to_string()),
            content_mime_detected: detected.map(str::to_string),
            from_url: None,
            from_fetch_status: None,
            from_to_is_same_host: None,
        }
    }

    #[test]
    fn classifies_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("table");
        let out = dir.path().join("out");
        let layout = PartitionLayout::new(table.to_str().unwrap(), out.to_str().unwrap());

        let success = capture("https://example.com/robots.txt", 200, Some("text/plain"));
        let html = capture("https://h.example/robots.txt", 200, Some("text/html"));
        let redirect = capture("https://r.example/robots.txt", 301, None);
        columnar::write_captures(
            &layout.capture_file(CRAWL, 0),
            &[success.clone(), html, redirect],
        )
        .unwrap();
        // The same projected row shows up again one redirect round later.
        columnar::write_captures(&layout.capture_file(CRAWL, 1), &[success]).unwrap();

        let path =
            write_ranked_list(table.to_str().unwrap(), out.to_str().unwrap(), CRAWL).unwrap();

        let records = columnar::read_ranked(&path).unwrap();
        assert_eq!(records.len(), 3);

        let success = records
            .iter()
            .find(|r| r.url == "https://example.com/robots.txt")
            .unwrap();
        assert_eq!(success.robotstxt_fetch_status, "success");
        assert!(success.is_robotstxt_mime_type);

        let html = records
            .iter()
            .find(|r| r.url == "https://h.example/robots.txt")
            .unwrap();
        assert!(!html.is_robotstxt_mime_type);

        let redirect = records
            .iter()
            .find(|r| r.url == "https://r.example/robots.txt")
            .unwrap();
        assert_eq!(redirect.robotstxt_fetch_status, "redirect");
        // Detected type absent, declared text/plain: counts as robots.txt.
        assert!(redirect.is_robotstxt_mime_type);
    }

    #[test]
    fn missing_crawl_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("table");
        std::fs::create_dir_all(&table).unwrap();

        let result = write_ranked_list(
            table.to_str().unwrap(),
            dir.path().join("out").to_str().unwrap(),
            CRAWL,
        );
        assert!(result.is_err());
    }
}
