//! End-to-end pipeline tests
//!
//! Seed a capture index with a small redirect chain, run the redirect
//! follower against the SQLite store, and check the partition layout and
//! the final list artifacts.

use robotstxt_captures::capture::PartitionLayout;
use robotstxt_captures::columnar;
use robotstxt_captures::follow::{follow_crawl, FollowSummary};
use robotstxt_captures::output::{write_download_list, write_ranked_list};
use robotstxt_captures::store::{create_index_tables, SqliteStore};
use rusqlite::{params, Connection};
use tempfile::TempDir;

const CRAWL: &str = "CC-MAIN-2022-33";

struct Pipeline {
    layout: PartitionLayout,
    lists_location: String,
    summary: FollowSummary,
    _dir: TempDir,
}

/// Builds the index, runs the redirect follower, and hands back the layout
/// for the assertions.
///
/// The seeded chain:
/// - `http://example.com/robots.txt` (rank 1) has an old 500 capture and a
///   newer 301 pointing at `https://www.example.com/robots.txt`, whose host
///   is not in the ranked list;
/// - `https://static.example/robots.txt` (rank 2) 302-redirects to the
///   relative `/moved/robots.txt`;
/// - the two redirect targets resolve to a 200 text/plain capture and a
///   404 html capture in round 1, where the chains end.
fn seed_and_follow() -> Pipeline {
    let dir = tempfile::tempdir().unwrap();
    let layout = PartitionLayout::new(
        dir.path().join("captures").to_str().unwrap(),
        dir.path().join("redirects").to_str().unwrap(),
    );

    let mut store = SqliteStore::open(&dir.path().join("index.sqlite"), layout.clone()).unwrap();
    create_index_tables(store.connection()).unwrap();
    seed_index(store.connection());

    let summary = follow_crawl(&mut store, &layout, CRAWL, 5).unwrap();

    let lists_location = dir.path().join("lists").to_str().unwrap().to_string();
    Pipeline {
        layout,
        lists_location,
        summary,
        _dir: dir,
    }
}

fn seed_index(conn: &Connection) {
    for (host, rank) in [("example.com", 1), ("static.example", 2)] {
        conn.execute(
            "INSERT INTO topdomains (host, domain, rank) VALUES (?1, ?1, ?2)",
            params![host, rank],
        )
        .unwrap();
    }

    let insert = "INSERT INTO ccindex
        (crawl, subset, url, url_host_name, url_path, url_query, fetch_time,
         fetch_status, warc_filename, warc_record_offset, warc_record_length,
         fetch_redirect, content_mime_type, content_mime_detected)
        VALUES (?1, 'robotstxt', ?2, ?3, ?4, NULL, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)";

    // Superseded capture: an earlier fetch of the same URL.
    conn.execute(
        insert,
        params![
            CRAWL,
            "http://example.com/robots.txt",
            "example.com",
            "/robots.txt",
            "2022-08-10T00:00:00+00:00",
            500,
            "w0.warc.gz",
            0i64,
            100,
            None::<String>,
            None::<String>,
            None::<String>,
        ],
    )
    .unwrap();

    // Latest capture of the rank-1 host: redirects off-list.
    conn.execute(
        insert,
        params![
            CRAWL,
            "http://example.com/robots.txt",
            "example.com",
            "/robots.txt",
            "2022-08-12T00:00:00+00:00",
            301,
            "w1.warc.gz",
            100i64,
            120,
            Some("https://www.example.com/robots.txt"),
            Some("text/html"),
            None::<String>,
        ],
    )
    .unwrap();

    // Rank-2 host: relative redirect.
    conn.execute(
        insert,
        params![
            CRAWL,
            "https://static.example/robots.txt",
            "static.example",
            "/robots.txt",
            "2022-08-12T01:00:00+00:00",
            302,
            "w1.warc.gz",
            400i64,
            110,
            Some("/moved/robots.txt"),
            None::<String>,
            None::<String>,
        ],
    )
    .unwrap();

    // Redirect target captures, reachable in round 1 only.
    conn.execute(
        insert,
        params![
            CRAWL,
            "https://www.example.com/robots.txt",
            "www.example.com",
            "/robots.txt",
            "2022-08-12T02:00:00+00:00",
            200,
            "w2.warc.gz",
            900i64,
            300,
            None::<String>,
            Some("text/plain"),
            Some("text/plain"),
        ],
    )
    .unwrap();
    conn.execute(
        insert,
        params![
            CRAWL,
            "https://static.example/moved/robots.txt",
            "static.example",
            "/moved/robots.txt",
            "2022-08-12T03:00:00+00:00",
            404,
            "w2.warc.gz",
            1500i64,
            200,
            None::<String>,
            Some("text/html"),
            Some("text/html"),
        ],
    )
    .unwrap();

    // A different crawl must never leak into this run.
    conn.execute(
        insert,
        params![
            "CC-MAIN-2021-04",
            "http://example.com/robots.txt",
            "example.com",
            "/robots.txt",
            "2021-01-20T00:00:00+00:00",
            200,
            "old.warc.gz",
            0i64,
            100,
            None::<String>,
            Some("text/plain"),
            Some("text/plain"),
        ],
    )
    .unwrap();
}

#[test]
fn follow_materializes_rounds_until_chains_end() {
    let pipeline = seed_and_follow();

    assert_eq!(pipeline.summary.rows_per_round, vec![2, 2]);
    assert_eq!(pipeline.summary.new_targets_per_round, vec![2, 0]);

    // Round partitions for depths 0 and 1, nothing beyond.
    let round0 = columnar::read_captures_dir(&pipeline.layout.capture_partition(CRAWL, 0)).unwrap();
    assert_eq!(round0.len(), 2);
    // The superseded 500 capture never surfaces.
    assert!(round0.iter().all(|row| row.fetch_status != 500));

    let round1 = columnar::read_captures_dir(&pipeline.layout.capture_partition(CRAWL, 1)).unwrap();
    assert_eq!(round1.len(), 2);
    assert!(!pipeline.layout.capture_partition(CRAWL, 2).exists());

    // Round 1 rows carry the chain provenance.
    let www = round1
        .iter()
        .find(|row| row.url == "https://www.example.com/robots.txt")
        .unwrap();
    assert_eq!(www.host, "example.com");
    assert_eq!(www.orig_url, "http://example.com/robots.txt");
    assert_eq!(www.from_url.as_deref(), Some("http://example.com/robots.txt"));
    assert_eq!(www.from_fetch_status, Some(301));
    assert_eq!(www.from_to_is_same_host, Some(false));

    let moved = round1
        .iter()
        .find(|row| row.url == "https://static.example/moved/robots.txt")
        .unwrap();
    assert_eq!(moved.host, "static.example");
    assert_eq!(moved.fetch_status, 404);
    assert_eq!(
        moved.from_url.as_deref(),
        Some("https://static.example/robots.txt")
    );
}

#[test]
fn frontier_partition_records_both_targets() {
    let pipeline = seed_and_follow();

    let edges = columnar::read_frontier(&pipeline.layout.frontier_file(CRAWL, 0)).unwrap();
    assert_eq!(edges.len(), 2);

    let mut targets: Vec<&str> = edges.iter().map(|e| e.to_url.as_str()).collect();
    targets.sort();
    assert_eq!(
        targets,
        vec![
            "https://static.example/moved/robots.txt",
            "https://www.example.com/robots.txt",
        ]
    );
    // The flag stays false even for same-host redirects.
    assert!(edges.iter().all(|e| !e.from_to_is_same_host));

    // No frontier was written for the final round.
    assert!(!pipeline.layout.frontier_file(CRAWL, 1).exists());
}

#[test]
fn ranked_list_classifies_all_rounds() {
    let pipeline = seed_and_follow();

    let path = write_ranked_list(
        &pipeline.layout.output_location,
        &pipeline.lists_location,
        CRAWL,
    )
    .unwrap();
    assert!(path.ends_with(format!("crawl={CRAWL}/robotstxt-captures-{CRAWL}.zstd.parquet")));

    let records = columnar::read_ranked(&path).unwrap();
    assert_eq!(records.len(), 4);

    let by_url = |url: &str| records.iter().find(|r| r.url == url).unwrap();

    let origin = by_url("http://example.com/robots.txt");
    assert_eq!(origin.robotstxt_fetch_status, "redirect");
    assert_eq!(origin.rank, 1);
    // Declared text/html with no detected type: not robots.txt-like.
    assert!(!origin.is_robotstxt_mime_type);

    let relative = by_url("https://static.example/robots.txt");
    assert_eq!(relative.robotstxt_fetch_status, "redirect");
    // No MIME information at all passes the filter.
    assert!(relative.is_robotstxt_mime_type);

    let www = by_url("https://www.example.com/robots.txt");
    assert_eq!(www.robotstxt_fetch_status, "success");
    assert_eq!(www.host, "example.com");
    assert!(www.is_robotstxt_mime_type);

    let moved = by_url("https://static.example/moved/robots.txt");
    assert_eq!(moved.robotstxt_fetch_status, "notfound");
    assert!(!moved.is_robotstxt_mime_type);
}

#[test]
fn download_list_keeps_successful_robotstxt_captures() {
    let pipeline = seed_and_follow();

    let path = write_download_list(
        &pipeline.layout.output_location,
        &pipeline.lists_location,
        CRAWL,
    )
    .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(
        lines,
        vec![
            "url,warc_filename,warc_record_offset,warc_record_length",
            "https://www.example.com/robots.txt,w2.warc.gz,900,300",
        ]
    );
}
