//! WARC download list
//!
//! Extracts the download list of WARC records for the successfully fetched,
//! robots.txt-like captures of one crawl.

use crate::capture;
use crate::classify::is_robotstxt_mime_type;
use crate::output::collect_crawl_captures;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DownloadRecord {
    url: String,
    warc_filename: String,
    warc_record_offset: i64,
    warc_record_length: i32,
}

/// Writes the CSV download list for one crawl and returns its path.
pub fn write_download_list(
    table_location: &str,
    output_location: &str,
    crawl: &str,
) -> crate::Result<PathBuf> {
    let rows = collect_crawl_captures(table_location, crawl)?;

    let fetched: Vec<_> = rows.iter().filter(|r| r.fetch_status == 200).collect();
    tracing::info!(
        "Extracted {} successfully fetched robots.txt captures for crawl {}",
        fetched.len(),
        crawl
    );

    let kept: Vec<_> = fetched
        .into_iter()
        .filter(|r| {
            is_robotstxt_mime_type(
                r.content_mime_detected.as_deref(),
                r.content_mime_type.as_deref(),
            )
        })
        .collect();
    tracing::info!(
        "After filtering by MIME type, got {} robots.txt captures for crawl {}",
        kept.len(),
        crawl
    );

    let mut unique = HashSet::with_capacity(kept.len());
    let mut records = Vec::with_capacity(kept.len());
    let mut removed = 0usize;
    for row in kept {
        let record = DownloadRecord {
            url: row.url.clone(),
            warc_filename: row.warc_filename.clone(),
            warc_record_offset: row.warc_record_offset,
            warc_record_length: row.warc_record_length,
        };
        if unique.insert(record.clone()) {
            records.push(record);
        } else {
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::info!("Removed {} duplicates in download list", removed);
    }

    let dir = capture::crawl_dir(output_location, crawl);
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("robotstxt-captures-{crawl}.csv"));

    let mut file = BufWriter::new(File::create(&path)?);
    writeln!(file, "url,warc_filename,warc_record_offset,warc_record_length")?;
    for record in &records {
        writeln!(
            file,
            "{},{},{},{}",
            csv_field(&record.url),
            csv_field(&record.warc_filename),
            record.warc_record_offset,
            record.warc_record_length
        )?;
    }
    file.flush()?;

    tracing::info!("Download list saved to {}", path.display());
    Ok(path)
}

/// Quotes a CSV field only when it contains a separator, quote or line
/// break.
fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(|c| matches!(c, ',' | '"' | '\n' | '\r')) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureRow, PartitionLayout};
    use crate::columnar;
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
            warc_record_offset: 2048,
            warc_record_length: 400,
            fetch_redirect: None,
            content_mime_type: None,
            content_mime_detected: detected.map(str::to_string),
            from_url: None,
            from_fetch_status: None,
            from_to_is_same_host: None,
        }
    }

    #[test]
    fn csv_field_quotes_only_when_needed() {
        assert_eq!(csv_field("https://example.com/robots.txt"), "https://example.com/robots.txt");
        assert_eq!(csv_field("https://example.com/a,b"), "\"https://example.com/a,b\"");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn keeps_successful_robotstxt_captures_only() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("table");
        let out = dir.path().join("out");
        let layout = PartitionLayout::new(table.to_str().unwrap(), out.to_str().unwrap());

        let good = capture("https://example.com/robots.txt", 200, Some("text/plain"));
        let html = capture("https://h.example/robots.txt", 200, Some("text/html"));
        let notfound = capture("https://n.example/robots.txt", 404, Some("text/plain"));
        columnar::write_captures(
            &layout.capture_file(CRAWL, 0),
            &[good.clone(), html, notfound],
        )
        .unwrap();
        // Duplicate of the good row from a later redirect round.
        columnar::write_captures(&layout.capture_file(CRAWL, 1), &[good]).unwrap();

        let path =
            write_download_list(table.to_str().unwrap(), out.to_str().unwrap(), CRAWL).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "url,warc_filename,warc_record_offset,warc_record_length",
                "https://example.com/robots.txt,crawl-data/robotstxt.warc.gz,2048,400",
            ]
        );
    }
}
