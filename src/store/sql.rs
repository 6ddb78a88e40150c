//! SQL templates for capture materialization
//!
//! Two parameterized view templates: the latest robots.txt capture per URL
//! for a crawl snapshot (round 0), and the latest capture per (origin host,
//! URL) when following a redirect target (rounds >= 1). Views cannot carry
//! bound parameters, so the crawl identifier and the redirect depth are
//! inlined, strings as quoted literals.

/// Columns exported from the materialized view, in [`crate::CaptureRow`]
/// field order.
pub const EXPORT_VIEW: &str = "\
SELECT host, domain, rank, orig_url, url_host_name, url,
       fetch_time, fetch_status,
       warc_filename, warc_record_offset, warc_record_length,
       fetch_redirect, content_mime_type, content_mime_detected,
       from_url, from_fetch_status, from_to_is_same_host
FROM _tmp_view";

/// Drops the per-round view again once its rows are exported.
pub const DROP_TMP_VIEW: &str = "DROP VIEW IF EXISTS _tmp_view;";

/// View of the latest robots.txt capture per URL for one crawl snapshot.
pub fn initial_capture_view(crawl: &str) -> String {
    format!(
        "\
DROP VIEW IF EXISTS _tmp_view;
CREATE TEMP VIEW _tmp_view AS
WITH allrobots AS (
  -- note: the table topdomains is expected to be created ahead
  SELECT topdomains.host AS host,
         topdomains.domain AS domain,
         topdomains.rank AS rank,
         cc.url AS orig_url,
         cc.url_host_name AS url_host_name,
         cc.url AS url,
         cc.fetch_time AS fetch_time,
         cc.fetch_status AS fetch_status,
         cc.warc_filename AS warc_filename,
         cc.warc_record_offset AS warc_record_offset,
         cc.warc_record_length AS warc_record_length,
         cc.fetch_redirect AS fetch_redirect,
         cc.content_mime_type AS content_mime_type,
         cc.content_mime_detected AS content_mime_detected,
         NULL AS from_url,
         NULL AS from_fetch_status,
         NULL AS from_to_is_same_host,
         -- enumerate records of same URL, most recent first
         ROW_NUMBER() OVER (PARTITION BY cc.url ORDER BY cc.fetch_time DESC) AS n
  FROM ccindex AS cc
  JOIN topdomains ON topdomains.host = cc.url_host_name
  WHERE cc.crawl = {crawl}
    AND cc.subset = 'robotstxt'
    AND cc.url_path = '/robots.txt'
    AND cc.url_query IS NULL)
SELECT * FROM allrobots
-- select only the first (most recent) record of the same URL
WHERE allrobots.n = 1;",
        crawl = quote_literal(crawl)
    )
}

/// View of the latest capture per (origin host, URL) for the redirect
/// targets queued at `frontier_depth`.
pub fn redirect_capture_view(crawl: &str, frontier_depth: u32) -> String {
    format!(
        "\
DROP VIEW IF EXISTS _tmp_view;
CREATE TEMP VIEW _tmp_view AS
WITH allrobots AS (
  -- note: the table redirects_to_follow is filled from the persisted
  --       frontier partitions by the partition refresh
  SELECT redir.host AS host,
         redir.domain AS domain,
         redir.rank AS rank,
         redir.orig_url AS orig_url,
         cc.url_host_name AS url_host_name,
         cc.url AS url,
         cc.fetch_time AS fetch_time,
         cc.fetch_status AS fetch_status,
         cc.warc_filename AS warc_filename,
         cc.warc_record_offset AS warc_record_offset,
         cc.warc_record_length AS warc_record_length,
         cc.fetch_redirect AS fetch_redirect,
         cc.content_mime_type AS content_mime_type,
         cc.content_mime_detected AS content_mime_detected,
         redir.from_url AS from_url,
         redir.from_fetch_status AS from_fetch_status,
         redir.from_to_is_same_host AS from_to_is_same_host,
         -- enumerate records of same <orig. host, URL>, most recent first
         ROW_NUMBER() OVER (PARTITION BY redir.host, cc.url ORDER BY cc.fetch_time DESC) AS n
  FROM ccindex AS cc
  JOIN redirects_to_follow AS redir ON redir.to_url = cc.url
  WHERE cc.crawl = {crawl}
    AND cc.subset = 'robotstxt'
    AND redir.crawl = {crawl}
    AND redir.redirects = {depth})
SELECT * FROM allrobots
-- select only the first (most recent) record of the same URL
WHERE allrobots.n = 1;",
        crawl = quote_literal(crawl),
        depth = frontier_depth
    )
}

/// Quotes a string as a SQL literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
