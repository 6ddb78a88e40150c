//! Database schema definitions
//!
//! The store owns the `redirects_to_follow` join table and the bookkeeping
//! of which frontier partition files have been loaded into it. The capture
//! index itself (`ccindex` joined with the ranked host list `topdomains`)
//! is expected to be created ahead of a run; its definitions are kept here
//! so operators and tests build the same shape.

use rusqlite::Connection;

/// Tables owned by the store
pub const SCHEMA_SQL: &str = r#"
-- Redirect targets queued per (crawl, redirect depth)
CREATE TABLE IF NOT EXISTS redirects_to_follow (
    crawl TEXT NOT NULL,
    redirects INTEGER NOT NULL,
    host TEXT NOT NULL,
    domain TEXT NOT NULL,
    rank INTEGER NOT NULL,
    orig_url TEXT NOT NULL,
    from_url TEXT NOT NULL,
    from_fetch_status INTEGER NOT NULL,
    from_to_is_same_host INTEGER NOT NULL,
    to_url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_redirects_crawl_depth
    ON redirects_to_follow(crawl, redirects);
CREATE INDEX IF NOT EXISTS idx_redirects_to_url
    ON redirects_to_follow(to_url);

-- Frontier partition files already loaded into redirects_to_follow
CREATE TABLE IF NOT EXISTS frontier_files (
    path TEXT PRIMARY KEY
);
"#;

/// Capture index tables, created ahead of a run
pub const INDEX_TABLES_SQL: &str = r#"
-- Local copy of the robots.txt subset of the capture index
CREATE TABLE IF NOT EXISTS ccindex (
    crawl TEXT NOT NULL,
    subset TEXT NOT NULL,
    url TEXT NOT NULL,
    url_host_name TEXT,
    url_path TEXT,
    url_query TEXT,
    fetch_time TEXT NOT NULL,
    fetch_status INTEGER NOT NULL,
    warc_filename TEXT NOT NULL,
    warc_record_offset INTEGER NOT NULL,
    warc_record_length INTEGER NOT NULL,
    fetch_redirect TEXT,
    content_mime_type TEXT,
    content_mime_detected TEXT
);

CREATE INDEX IF NOT EXISTS idx_ccindex_host ON ccindex(url_host_name);
CREATE INDEX IF NOT EXISTS idx_ccindex_url ON ccindex(url);

-- Ranked host list the round-0 lookup is keyed to
CREATE TABLE IF NOT EXISTS topdomains (
    host TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    rank INTEGER NOT NULL
);
"#;

/// Creates the store-owned tables if they do not exist.
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Creates the capture index tables (operator/test bootstrap).
pub fn create_index_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(INDEX_TABLES_SQL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_initializes_on_empty_database() {
        let conn = Connection::open_in_memory().unwrap();
        initialize_schema(&conn).unwrap();
        // Idempotent
        initialize_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM redirects_to_follow", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn index_tables_bootstrap() {
        let conn = Connection::open_in_memory().unwrap();
        create_index_tables(&conn).unwrap();

        conn.execute(
            "INSERT INTO topdomains (host, domain, rank) VALUES (?1, ?2, ?3)",
            rusqlite::params!["example.com", "example.com", 1],
        )
        .unwrap();
    }
}
