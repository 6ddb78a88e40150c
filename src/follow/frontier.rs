//! Redirect frontier builder
//!
//! Reads one round's exported capture partition, resolves redirect targets
//! to absolute URLs, drops empty and self-redirects, and persists the
//! remaining targets as the next round's input table. The caller threads
//! the set of URLs seen in earlier rounds through every invocation; only
//! targets outside that set count as new work.

use crate::capture::{CaptureRow, PartitionLayout, RedirectEdge};
use crate::columnar;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use url::Url;

/// Per-round counters of how redirect targets were handled.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RedirectCounts {
    /// Capture rows read for the round
    pub rows: u64,

    /// Rows carrying a redirect target
    pub redirects: u64,

    /// Empty-string targets, dropped
    pub redirects_empty: u64,

    /// Targets that were already absolute URLs
    pub redirects_absolute: u64,

    /// Relative targets, resolved against the capture URL
    pub redirects_relative: u64,

    /// Targets pointing at the capture's own URL, dropped
    pub redirects_self: u64,

    /// Targets already seen in an earlier round (kept for the chain)
    pub redirects_target_known: u64,

    /// Targets already queued during this round
    pub redirects_duplicates: u64,

    /// New distinct targets to follow
    pub redirects_to_follow: u64,
}

impl RedirectCounts {
    fn log(&self) {
        tracing::info!("Redirects processed:");
        tracing::info!("{:6}\trows", self.rows);
        tracing::info!("{:6}\tredirects", self.redirects);
        tracing::info!("{:6}\tredirects_empty", self.redirects_empty);
        tracing::info!("{:6}\tredirects_absolute", self.redirects_absolute);
        tracing::info!("{:6}\tredirects_relative", self.redirects_relative);
        tracing::info!("{:6}\tredirects_self", self.redirects_self);
        tracing::info!("{:6}\tredirects_target_known", self.redirects_target_known);
        tracing::info!("{:6}\tredirects_duplicates", self.redirects_duplicates);
        tracing::info!("{:6}\tredirects_to_follow", self.redirects_to_follow);
    }
}

/// Builds the redirect frontier from round `depth`'s capture partition.
///
/// Every URL of the round is added to `urls_seen` first, so a target equal
/// to another URL captured in the same round already classifies as known.
/// Targets of every classification are persisted (the chain from the
/// original /robots.txt URL to the final location must survive for
/// WARC-level deduplication), but only targets never seen before count
/// toward `redirects_to_follow`, which drives loop termination.
///
/// Returns the round's counters; nothing is persisted when no targets are
/// pending at all.
pub fn build_frontier(
    layout: &PartitionLayout,
    crawl: &str,
    depth: u32,
    urls_seen: &mut HashSet<String>,
) -> crate::Result<RedirectCounts> {
    let partition = layout.capture_partition(crawl, depth);
    let rows = columnar::read_captures_dir(&partition)?;

    let mut counts = RedirectCounts {
        rows: rows.len() as u64,
        ..Default::default()
    };

    for row in &rows {
        urls_seen.insert(row.url.clone());
    }
    tracing::info!("{:6}\tunique URLs known", urls_seen.len());

    // Pending targets in first-seen order, each with the rows that
    // redirected to it.
    let mut pending: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        let Some(raw_target) = row.fetch_redirect.as_deref() else {
            continue;
        };
        counts.redirects += 1;

        if raw_target.is_empty() {
            counts.redirects_empty += 1;
            continue;
        }

        let target = if raw_target.starts_with("http://") || raw_target.starts_with("https://") {
            counts.redirects_absolute += 1;
            raw_target.to_string()
        } else {
            counts.redirects_relative += 1;
            match resolve_relative(&row.url, raw_target) {
                Some(resolved) => resolved,
                None => {
                    tracing::error!(
                        "Failed to resolve redirect target `{}` against `{}`",
                        raw_target,
                        row.url
                    );
                    continue;
                }
            }
        };

        if target == row.url {
            // Nothing to do for redirect targets pointing to the URL itself.
            counts.redirects_self += 1;
            continue;
        }

        if urls_seen.contains(&target) {
            counts.redirects_target_known += 1;
        } else if pending.contains_key(&target) {
            counts.redirects_duplicates += 1;
        } else {
            counts.redirects_to_follow += 1;
        }

        // Known targets are appended as well: the chain from the initial
        // /robots.txt URL to the final location is reconstructed later,
        // WARC records are deduplicated before download.
        match pending.entry(target.clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().push(idx),
            Entry::Vacant(entry) => {
                order.push(target);
                entry.insert(vec![idx]);
            }
        }
    }

    counts.log();

    if pending.is_empty() {
        return Ok(counts);
    }

    let mut edges = Vec::with_capacity(counts.redirects as usize);
    for target in &order {
        for &idx in &pending[target] {
            let row = &rows[idx];
            edges.push(RedirectEdge {
                host: row.host.clone(),
                domain: row.domain.clone(),
                rank: row.rank,
                orig_url: row.orig_url.clone(),
                from_url: row.url.clone(),
                from_fetch_status: row.fetch_status,
                from_to_is_same_host: redirect_same_host(row, target),
                to_url: target.clone(),
            });
        }
    }

    let path = layout.frontier_file(crawl, depth);
    columnar::write_frontier(&path, &edges)?;
    tracing::info!(
        "{} redirect target(s) ({} new) for crawl {} written to {}",
        pending.len(),
        counts.redirects_to_follow,
        crawl,
        path.display()
    );

    Ok(counts)
}

/// Resolves a relative redirect target against the capture's URL.
fn resolve_relative(base: &str, target: &str) -> Option<String> {
    let base = Url::parse(base).ok()?;
    base.join(target).ok().map(|url| url.to_string())
}

/// Whether the redirecting capture stayed on the target's host.
///
/// The target is parsed only to surface unparseable URLs in the log; the
/// parsed hostname is never captured into `target_host`, so the flag is
/// false for every row with a known host (and true only when the origin
/// host is itself unknown). Published lists bake these values in.
/// TODO: capture the parsed hostname and compare it against url_host_name;
/// needs the downstream list consumers migrated off the always-false flag
/// first.
fn redirect_same_host(row: &CaptureRow, target: &str) -> bool {
    let target_host: Option<String> = None;
    if let Err(e) = Url::parse(target) {
        tracing::error!("Failed to parse redirect target `{}`: {}", target, e);
    }
    row.url_host_name == target_host
}
