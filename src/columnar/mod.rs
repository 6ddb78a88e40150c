//! Columnar I/O for partition and list artifacts
//!
//! Capture partitions, frontier tables and the ranked list are exchanged as
//! ZSTD-compressed Parquet files. This module owns the three schemas and
//! the typed read/write functions; everything else in the crate works with
//! the record structs from [`crate::capture`].

use crate::capture::{CaptureRow, RankedRecord, RedirectEdge};
use arrow::array::{Array, ArrayRef, BooleanArray, Int32Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// ZSTD level for round partitions and frontier tables
const PARTITION_ZSTD_LEVEL: i32 = 3;

/// ZSTD level for the ranked list artifact
const RANKED_LIST_ZSTD_LEVEL: i32 = 19;

/// Errors that can occur during columnar I/O
#[derive(Debug, Error)]
pub enum ColumnarError {
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Partition not found: {0}")]
    PartitionNotFound(PathBuf),

    #[error("Missing or mistyped column `{0}`")]
    Column(&'static str),

    #[error("Unexpected null in column `{0}`")]
    Null(&'static str),

    #[error("Invalid fetch_time `{value}`: {source}")]
    Time {
        value: String,
        source: chrono::ParseError,
    },
}

/// Result type for columnar operations
pub type ColumnarResult<T> = Result<T, ColumnarError>;

/// Schema of one round's capture partition.
///
/// One schema for every round: round 0 leaves the `from_*` columns null.
pub fn capture_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("host", DataType::Utf8, false),
        Field::new("domain", DataType::Utf8, false),
        Field::new("rank", DataType::Int32, false),
        Field::new("orig_url", DataType::Utf8, false),
        Field::new("url_host_name", DataType::Utf8, true),
        Field::new("url", DataType::Utf8, false),
        Field::new("fetch_time", DataType::Utf8, false),
        Field::new("fetch_status", DataType::Int32, false),
        Field::new("warc_filename", DataType::Utf8, false),
        Field::new("warc_record_offset", DataType::Int64, false),
        Field::new("warc_record_length", DataType::Int32, false),
        Field::new("fetch_redirect", DataType::Utf8, true),
        Field::new("content_mime_type", DataType::Utf8, true),
        Field::new("content_mime_detected", DataType::Utf8, true),
        Field::new("from_url", DataType::Utf8, true),
        Field::new("from_fetch_status", DataType::Int32, true),
        Field::new("from_to_is_same_host", DataType::Boolean, true),
    ]))
}

/// Schema of the frontier table persisted between rounds.
pub fn frontier_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("host", DataType::Utf8, false),
        Field::new("domain", DataType::Utf8, false),
        Field::new("rank", DataType::Int32, false),
        Field::new("orig_url", DataType::Utf8, false),
        Field::new("from_url", DataType::Utf8, false),
        Field::new("from_fetch_status", DataType::Int32, false),
        Field::new("from_to_is_same_host", DataType::Boolean, false),
        Field::new("to_url", DataType::Utf8, false),
    ]))
}

/// Schema of the ranked list artifact.
pub fn ranked_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("host", DataType::Utf8, false),
        Field::new("domain", DataType::Utf8, false),
        Field::new("rank", DataType::Int32, false),
        Field::new("url", DataType::Utf8, false),
        Field::new("fetch_status", DataType::Int32, false),
        Field::new("fetch_redirect", DataType::Utf8, true),
        Field::new("content_mime_type", DataType::Utf8, true),
        Field::new("content_mime_detected", DataType::Utf8, true),
        Field::new("robotstxt_fetch_status", DataType::Utf8, false),
        Field::new("is_robotstxt_mime_type", DataType::Boolean, false),
    ]))
}

/// Writes one round's capture rows as a ZSTD Parquet file, creating parent
/// directories as needed. An empty row slice still produces a valid file so
/// the partition exists on disk.
pub fn write_captures(path: &Path, rows: &[CaptureRow]) -> ColumnarResult<()> {
    let schema = capture_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.host.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.domain.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(rows.iter().map(|r| r.rank))),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.orig_url.as_str()),
        )),
        Arc::new(
            rows.iter()
                .map(|r| r.url_host_name.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.url.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.fetch_time.to_rfc3339()),
        )),
        Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|r| r.fetch_status),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.warc_filename.as_str()),
        )),
        Arc::new(Int64Array::from_iter_values(
            rows.iter().map(|r| r.warc_record_offset),
        )),
        Arc::new(Int32Array::from_iter_values(
            rows.iter().map(|r| r.warc_record_length),
        )),
        Arc::new(
            rows.iter()
                .map(|r| r.fetch_redirect.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            rows.iter()
                .map(|r| r.content_mime_type.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            rows.iter()
                .map(|r| r.content_mime_detected.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            rows.iter()
                .map(|r| r.from_url.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            rows.iter()
                .map(|r| r.from_fetch_status)
                .collect::<Int32Array>(),
        ),
        Arc::new(
            rows.iter()
                .map(|r| r.from_to_is_same_host)
                .collect::<BooleanArray>(),
        ),
    ];

    write_batch(path, schema, columns, PARTITION_ZSTD_LEVEL)
}

/// Reads capture rows from a single Parquet file.
pub fn read_captures_file(path: &Path) -> ColumnarResult<Vec<CaptureRow>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut rows = Vec::new();
    for batch in reader {
        let batch = batch?;

        let host = string_col(&batch, "host")?;
        let domain = string_col(&batch, "domain")?;
        let rank = i32_col(&batch, "rank")?;
        let orig_url = string_col(&batch, "orig_url")?;
        let url_host_name = string_col(&batch, "url_host_name")?;
        let url = string_col(&batch, "url")?;
        let fetch_time = string_col(&batch, "fetch_time")?;
        let fetch_status = i32_col(&batch, "fetch_status")?;
        let warc_filename = string_col(&batch, "warc_filename")?;
        let warc_record_offset = i64_col(&batch, "warc_record_offset")?;
        let warc_record_length = i32_col(&batch, "warc_record_length")?;
        let fetch_redirect = string_col(&batch, "fetch_redirect")?;
        let content_mime_type = string_col(&batch, "content_mime_type")?;
        let content_mime_detected = string_col(&batch, "content_mime_detected")?;
        let from_url = string_col(&batch, "from_url")?;
        let from_fetch_status = i32_col(&batch, "from_fetch_status")?;
        let from_to_is_same_host = bool_col(&batch, "from_to_is_same_host")?;

        for i in 0..batch.num_rows() {
            rows.push(CaptureRow {
                host: req_str(host, i, "host")?,
                domain: req_str(domain, i, "domain")?,
                rank: req_i32(rank, i, "rank")?,
                orig_url: req_str(orig_url, i, "orig_url")?,
                url_host_name: opt_str(url_host_name, i),
                url: req_str(url, i, "url")?,
                fetch_time: parse_fetch_time(&req_str(fetch_time, i, "fetch_time")?)?,
                fetch_status: req_i32(fetch_status, i, "fetch_status")?,
                warc_filename: req_str(warc_filename, i, "warc_filename")?,
                warc_record_offset: req_i64(warc_record_offset, i, "warc_record_offset")?,
                warc_record_length: req_i32(warc_record_length, i, "warc_record_length")?,
                fetch_redirect: opt_str(fetch_redirect, i),
                content_mime_type: opt_str(content_mime_type, i),
                content_mime_detected: opt_str(content_mime_detected, i),
                from_url: opt_str(from_url, i),
                from_fetch_status: opt_i32(from_fetch_status, i),
                from_to_is_same_host: opt_bool(from_to_is_same_host, i),
            });
        }
    }

    Ok(rows)
}

/// Reads every Parquet file of one partition directory, in file-name order.
pub fn read_captures_dir(dir: &Path) -> ColumnarResult<Vec<CaptureRow>> {
    let mut rows = Vec::new();
    for path in parquet_files(dir)? {
        rows.extend(read_captures_file(&path)?);
    }
    Ok(rows)
}

/// Writes the frontier table for one round.
pub fn write_frontier(path: &Path, edges: &[RedirectEdge]) -> ColumnarResult<()> {
    let schema = frontier_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            edges.iter().map(|e| e.host.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            edges.iter().map(|e| e.domain.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(edges.iter().map(|e| e.rank))),
        Arc::new(StringArray::from_iter_values(
            edges.iter().map(|e| e.orig_url.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            edges.iter().map(|e| e.from_url.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(
            edges.iter().map(|e| e.from_fetch_status),
        )),
        Arc::new(BooleanArray::from(
            edges
                .iter()
                .map(|e| e.from_to_is_same_host)
                .collect::<Vec<bool>>(),
        )),
        Arc::new(StringArray::from_iter_values(
            edges.iter().map(|e| e.to_url.as_str()),
        )),
    ];

    write_batch(path, schema, columns, PARTITION_ZSTD_LEVEL)
}

/// Reads a frontier table back.
pub fn read_frontier(path: &Path) -> ColumnarResult<Vec<RedirectEdge>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut edges = Vec::new();
    for batch in reader {
        let batch = batch?;

        let host = string_col(&batch, "host")?;
        let domain = string_col(&batch, "domain")?;
        let rank = i32_col(&batch, "rank")?;
        let orig_url = string_col(&batch, "orig_url")?;
        let from_url = string_col(&batch, "from_url")?;
        let from_fetch_status = i32_col(&batch, "from_fetch_status")?;
        let from_to_is_same_host = bool_col(&batch, "from_to_is_same_host")?;
        let to_url = string_col(&batch, "to_url")?;

        for i in 0..batch.num_rows() {
            edges.push(RedirectEdge {
                host: req_str(host, i, "host")?,
                domain: req_str(domain, i, "domain")?,
                rank: req_i32(rank, i, "rank")?,
                orig_url: req_str(orig_url, i, "orig_url")?,
                from_url: req_str(from_url, i, "from_url")?,
                from_fetch_status: req_i32(from_fetch_status, i, "from_fetch_status")?,
                from_to_is_same_host: req_bool(from_to_is_same_host, i, "from_to_is_same_host")?,
                to_url: req_str(to_url, i, "to_url")?,
            });
        }
    }

    Ok(edges)
}

/// Writes the ranked list artifact (highest ZSTD level; the file is final).
pub fn write_ranked(path: &Path, records: &[RankedRecord]) -> ColumnarResult<()> {
    let schema = ranked_schema();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.host.as_str()),
        )),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.domain.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.rank))),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.url.as_str()),
        )),
        Arc::new(Int32Array::from_iter_values(
            records.iter().map(|r| r.fetch_status),
        )),
        Arc::new(
            records
                .iter()
                .map(|r| r.fetch_redirect.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            records
                .iter()
                .map(|r| r.content_mime_type.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(
            records
                .iter()
                .map(|r| r.content_mime_detected.as_deref())
                .collect::<StringArray>(),
        ),
        Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.robotstxt_fetch_status.as_str()),
        )),
        Arc::new(BooleanArray::from(
            records
                .iter()
                .map(|r| r.is_robotstxt_mime_type)
                .collect::<Vec<bool>>(),
        )),
    ];

    write_batch(path, schema, columns, RANKED_LIST_ZSTD_LEVEL)
}

/// Reads a ranked list artifact back.
pub fn read_ranked(path: &Path) -> ColumnarResult<Vec<RankedRecord>> {
    let file = File::open(path)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;

        let host = string_col(&batch, "host")?;
        let domain = string_col(&batch, "domain")?;
        let rank = i32_col(&batch, "rank")?;
        let url = string_col(&batch, "url")?;
        let fetch_status = i32_col(&batch, "fetch_status")?;
        let fetch_redirect = string_col(&batch, "fetch_redirect")?;
        let content_mime_type = string_col(&batch, "content_mime_type")?;
        let content_mime_detected = string_col(&batch, "content_mime_detected")?;
        let robotstxt_fetch_status = string_col(&batch, "robotstxt_fetch_status")?;
        let is_robotstxt_mime_type = bool_col(&batch, "is_robotstxt_mime_type")?;

        for i in 0..batch.num_rows() {
            records.push(RankedRecord {
                host: req_str(host, i, "host")?,
                domain: req_str(domain, i, "domain")?,
                rank: req_i32(rank, i, "rank")?,
                url: req_str(url, i, "url")?,
                fetch_status: req_i32(fetch_status, i, "fetch_status")?,
                fetch_redirect: opt_str(fetch_redirect, i),
                content_mime_type: opt_str(content_mime_type, i),
                content_mime_detected: opt_str(content_mime_detected, i),
                robotstxt_fetch_status: req_str(robotstxt_fetch_status, i, "robotstxt_fetch_status")?,
                is_robotstxt_mime_type: req_bool(is_robotstxt_mime_type, i, "is_robotstxt_mime_type")?,
            });
        }
    }

    Ok(records)
}

/// Lists the Parquet files of a partition directory in file-name order.
pub fn parquet_files(dir: &Path) -> ColumnarResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ColumnarError::PartitionNotFound(dir.to_path_buf()));
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "parquet"))
        .collect();
    files.sort();
    Ok(files)
}

fn write_batch(
    path: &Path,
    schema: SchemaRef,
    columns: Vec<ArrayRef>,
    zstd_level: i32,
) -> ColumnarResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(zstd_level)?))
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn parse_fetch_time(value: &str) -> ColumnarResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| ColumnarError::Time {
            value: value.to_string(),
            source,
        })
}

fn string_col<'a>(batch: &'a RecordBatch, name: &'static str) -> ColumnarResult<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or(ColumnarError::Column(name))
}

fn i32_col<'a>(batch: &'a RecordBatch, name: &'static str) -> ColumnarResult<&'a Int32Array> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<Int32Array>())
        .ok_or(ColumnarError::Column(name))
}

fn i64_col<'a>(batch: &'a RecordBatch, name: &'static str) -> ColumnarResult<&'a Int64Array> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<Int64Array>())
        .ok_or(ColumnarError::Column(name))
}

fn bool_col<'a>(batch: &'a RecordBatch, name: &'static str) -> ColumnarResult<&'a BooleanArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<BooleanArray>())
        .ok_or(ColumnarError::Column(name))
}

fn req_str(arr: &StringArray, i: usize, name: &'static str) -> ColumnarResult<String> {
    if arr.is_null(i) {
        return Err(ColumnarError::Null(name));
    }
    Ok(arr.value(i).to_string())
}

fn opt_str(arr: &StringArray, i: usize) -> Option<String> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i).to_string())
    }
}

fn req_i32(arr: &Int32Array, i: usize, name: &'static str) -> ColumnarResult<i32> {
    if arr.is_null(i) {
        return Err(ColumnarError::Null(name));
    }
    Ok(arr.value(i))
}

fn opt_i32(arr: &Int32Array, i: usize) -> Option<i32> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i))
    }
}

fn req_i64(arr: &Int64Array, i: usize, name: &'static str) -> ColumnarResult<i64> {
    if arr.is_null(i) {
        return Err(ColumnarError::Null(name));
    }
    Ok(arr.value(i))
}

fn req_bool(arr: &BooleanArray, i: usize, name: &'static str) -> ColumnarResult<bool> {
    if arr.is_null(i) {
        return Err(ColumnarError::Null(name));
    }
    Ok(arr.value(i))
}

fn opt_bool(arr: &BooleanArray, i: usize) -> Option<bool> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_capture(url: &str, redirect: Option<&str>) -> CaptureRow {
        CaptureRow {
            host: "example.com".to_string(),
            domain: "example.com".to_string(),
            rank: 1,
            orig_url: "https://example.com/robots.txt".to_string(),
            url_host_name: Some("example.com".to_string()),
            url: url.to_string(),
            fetch_time: Utc.with_ymd_and_hms(2022, 8, 12, 10, 0, 0).unwrap(),
            fetch_status: 200,
            warc_filename: "crawl-data/CC-MAIN-2022-33/robotstxt.warc.gz".to_string(),
            warc_record_offset: 1024,
            warc_record_length: 560,
            fetch_redirect: redirect.map(str::to_string),
            content_mime_type: Some("text/plain".to_string()),
            content_mime_detected: None,
            from_url: None,
            from_fetch_status: None,
            from_to_is_same_host: None,
        }
    }

    #[test]
    fn captures_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.zstd.parquet");

        let rows = vec![
            sample_capture("https://example.com/robots.txt", Some("/r.txt")),
            sample_capture("https://other.example/robots.txt", None),
        ];
        write_captures(&path, &rows).unwrap();

        let back = read_captures_file(&path).unwrap();
        assert_eq!(back, rows);
    }

    #[test]
    fn empty_partition_file_is_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captures.zstd.parquet");

        write_captures(&path, &[]).unwrap();
        assert!(read_captures_file(&path).unwrap().is_empty());
    }

    #[test]
    fn dir_read_concatenates_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = sample_capture("https://a.example/robots.txt", None);
        let b = sample_capture("https://b.example/robots.txt", None);

        write_captures(&dir.path().join("part-b.parquet"), &[b.clone()]).unwrap();
        write_captures(&dir.path().join("part-a.parquet"), &[a.clone()]).unwrap();
        // A stray non-parquet file is ignored.
        std::fs::write(dir.path().join("_SUCCESS"), b"").unwrap();

        let rows = read_captures_dir(dir.path()).unwrap();
        assert_eq!(rows, vec![a, b]);
    }

    #[test]
    fn missing_partition_dir_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("crawl=CC-MAIN-2022-33").join("redirects=0");
        match read_captures_dir(&missing) {
            Err(ColumnarError::PartitionNotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected PartitionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn frontier_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("redirects-to-follow.zstd.parquet");

        let edges = vec![RedirectEdge {
            host: "example.com".to_string(),
            domain: "example.com".to_string(),
            rank: 7,
            orig_url: "http://example.com/robots.txt".to_string(),
            from_url: "http://example.com/robots.txt".to_string(),
            from_fetch_status: 301,
            from_to_is_same_host: false,
            to_url: "https://example.com/robots.txt".to_string(),
        }];
        write_frontier(&path, &edges).unwrap();

        assert_eq!(read_frontier(&path).unwrap(), edges);
    }

    #[test]
    fn ranked_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ranked.zstd.parquet");

        let records = vec![RankedRecord {
            host: "example.com".to_string(),
            domain: "example.com".to_string(),
            rank: 1,
            url: "https://example.com/robots.txt".to_string(),
            fetch_status: 200,
            fetch_redirect: None,
            content_mime_type: Some("text/plain".to_string()),
            content_mime_detected: Some("text/plain".to_string()),
            robotstxt_fetch_status: "success".to_string(),
            is_robotstxt_mime_type: true,
        }];
        write_ranked(&path, &records).unwrap();

        assert_eq!(read_ranked(&path).unwrap(), records);
    }
}
