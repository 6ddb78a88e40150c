//! SQLite-backed table store
//!
//! Production implementation of the [`TableStore`] trait over a local copy
//! of the capture index. Round materialization runs the view templates and
//! exports the selected rows as a Parquet partition; the partition refresh
//! scans the redirect-target location for frontier files not yet loaded
//! into the `redirects_to_follow` join table.

use crate::capture::{CaptureRow, PartitionLayout};
use crate::columnar;
use crate::store::schema::initialize_schema;
use crate::store::sql;
use crate::store::traits::{QueryInfo, StoreError, StoreResult, TableStore};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// SQLite query backend
pub struct SqliteStore {
    conn: Connection,
    layout: PartitionLayout,
}

impl SqliteStore {
    /// Opens the capture index database and prepares the store-owned
    /// tables.
    ///
    /// The `ccindex` and `topdomains` tables are expected to be created
    /// (and filled) ahead of a run.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `layout` - Locations the store exports to and loads from
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened database
    /// * `Err(StoreError)` - Failed to open or prepare the database
    pub fn open(path: &Path, layout: PartitionLayout) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn, layout })
    }

    /// The underlying connection, for index bootstrap and inspection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Exports the rows of the materialized view as this round's Parquet
    /// partition and returns the row count.
    fn export_round(&self, crawl: &str, depth: u32) -> StoreResult<u64> {
        let mut stmt = self.conn.prepare(sql::EXPORT_VIEW)?;
        let mapped = stmt.query_map([], |row| {
            Ok(CaptureRow {
                host: row.get(0)?,
                domain: row.get(1)?,
                rank: row.get(2)?,
                orig_url: row.get(3)?,
                url_host_name: row.get(4)?,
                url: row.get(5)?,
                fetch_time: row.get(6)?,
                fetch_status: row.get(7)?,
                warc_filename: row.get(8)?,
                warc_record_offset: row.get(9)?,
                warc_record_length: row.get(10)?,
                fetch_redirect: row.get(11)?,
                content_mime_type: row.get(12)?,
                content_mime_detected: row.get(13)?,
                from_url: row.get(14)?,
                from_fetch_status: row.get(15)?,
                from_to_is_same_host: row.get(16)?,
            })
        })?;
        let captures: Vec<CaptureRow> = mapped.collect::<Result<_, _>>()?;

        let path = self.layout.capture_file(crawl, depth);
        columnar::write_captures(&path, &captures)?;
        tracing::info!(
            "Exported {} capture(s) for crawl {} at redirect depth {} to {}",
            captures.len(),
            crawl,
            depth,
            path.display()
        );

        Ok(captures.len() as u64)
    }

    /// Frontier partition files under the redirect-target location, with
    /// the (crawl, depth) coordinates parsed from the partition path.
    fn frontier_partition_files(&self) -> StoreResult<Vec<(String, u32, PathBuf)>> {
        let root = Path::new(&self.layout.redirect_target_location);
        let mut found = Vec::new();
        if !root.is_dir() {
            return Ok(found);
        }

        for crawl_entry in fs::read_dir(root)? {
            let crawl_dir = crawl_entry?.path();
            let Some(crawl) = partition_value(&crawl_dir, "crawl=") else {
                continue;
            };
            for depth_entry in fs::read_dir(&crawl_dir)? {
                let depth_dir = depth_entry?.path();
                let Some(depth) = partition_value(&depth_dir, "redirects=") else {
                    continue;
                };
                let depth: u32 = depth
                    .parse()
                    .map_err(|_| StoreError::InvalidPartitionPath(depth_dir.clone()))?;
                for file in columnar::parquet_files(&depth_dir)? {
                    found.push((crawl.clone(), depth, file));
                }
            }
        }

        found.sort();
        Ok(found)
    }

    fn is_loaded(&self, path_key: &str) -> StoreResult<bool> {
        let known = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM frontier_files WHERE path = ?1)",
            params![path_key],
            |row| row.get(0),
        )?;
        Ok(known)
    }
}

impl TableStore for SqliteStore {
    fn materialize_round(&mut self, crawl: &str, depth: u32) -> StoreResult<QueryInfo> {
        let started = Instant::now();

        let view_sql = if depth == 0 {
            sql::initial_capture_view(crawl)
        } else {
            sql::redirect_capture_view(crawl, depth - 1)
        };
        tracing::debug!("Create view query:\n{}", view_sql);
        self.conn.execute_batch(&view_sql)?;

        let exported = self.export_round(crawl, depth);
        // Drop the view even when the export failed.
        let dropped = self.conn.execute_batch(sql::DROP_TMP_VIEW);
        let rows = exported?;
        dropped?;

        Ok(QueryInfo::succeeded(rows, started.elapsed()))
    }

    fn refresh_partitions(&mut self) -> StoreResult<QueryInfo> {
        let started = Instant::now();

        let mut loaded_rows = 0u64;
        let mut loaded_files = 0u64;

        for (crawl, depth, file) in self.frontier_partition_files()? {
            let path_key = file.to_string_lossy().into_owned();
            if self.is_loaded(&path_key)? {
                continue;
            }

            let edges = columnar::read_frontier(&file)?;

            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO redirects_to_follow
                     (crawl, redirects, host, domain, rank, orig_url,
                      from_url, from_fetch_status, from_to_is_same_host, to_url)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                )?;
                for edge in &edges {
                    stmt.execute(params![
                        crawl,
                        depth,
                        edge.host,
                        edge.domain,
                        edge.rank,
                        edge.orig_url,
                        edge.from_url,
                        edge.from_fetch_status,
                        edge.from_to_is_same_host,
                        edge.to_url,
                    ])?;
                }
            }
            tx.execute(
                "INSERT INTO frontier_files (path) VALUES (?1)",
                params![path_key],
            )?;
            tx.commit()?;

            loaded_rows += edges.len() as u64;
            loaded_files += 1;
        }

        tracing::info!(
            "Loaded {} frontier partition file(s), {} redirect target row(s)",
            loaded_files,
            loaded_rows
        );

        Ok(QueryInfo::succeeded(loaded_rows, started.elapsed()))
    }
}

/// Extracts the value of a `key=value` partition directory name.
fn partition_value(dir: &Path, prefix: &str) -> Option<String> {
    if !dir.is_dir() {
        return None;
    }
    dir.file_name()?
        .to_str()?
        .strip_prefix(prefix)
        .map(str::to_string)
}
