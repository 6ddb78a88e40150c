//! robotstxt-captures main entry point
//!
//! Command-line interface for extracting and post-processing robots.txt
//! capture records from Common Crawl's robots.txt dataset.

use anyhow::Context;
use clap::{Parser, Subcommand};
use robotstxt_captures::config::{CapturesSettings, ListSettings};
use robotstxt_captures::follow::follow_crawl;
use robotstxt_captures::output::{write_download_list, write_ranked_list};
use robotstxt_captures::ranks::combine_sorted_with_rank;
use robotstxt_captures::store::SqliteStore;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Extract and post-process robots.txt captures from Common Crawl
#[derive(Parser, Debug)]
#[command(name = "robotstxt-captures")]
#[command(version)]
#[command(about = "Extract robots.txt captures from Common Crawl's robots.txt dataset", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find robots.txt captures for the ranked host list and follow
    /// redirects across query rounds
    Captures {
        /// Capture index database (ccindex and topdomains created ahead)
        database: PathBuf,

        /// Output location for the exported capture partitions
        output_location: String,

        /// Location holding the redirect target tables required for table
        /// joins when following redirects
        redirect_target_location: String,

        /// Follow up to n redirects
        #[arg(long, default_value_t = 5)]
        follow_redirects: u32,

        /// Common Crawl crawl dataset(s) to process, e.g. CC-MAIN-2022-33
        #[arg(required = true)]
        crawl_data_set: Vec<String>,
    },

    /// Write the ranked list of hosts and their robots.txt capture status
    RankedList {
        /// Location of the exported capture table
        table_location: String,

        /// Output location for the ranked list
        output_location: String,

        /// Common Crawl crawl dataset(s) to process, e.g. CC-MAIN-2022-33
        #[arg(required = true)]
        crawl_data_set: Vec<String>,
    },

    /// Write the WARC download list of successful robots.txt captures
    DownloadList {
        /// Location of the exported capture table
        table_location: String,

        /// Output location for the download list
        output_location: String,

        /// Common Crawl crawl dataset(s) to process, e.g. CC-MAIN-2022-33
        #[arg(required = true)]
        crawl_data_set: Vec<String>,
    },

    /// Combine multiple sorted ranked lists into a single one using the
    /// Dowdall rule
    CombineRanks {
        /// Field separator between rank and value
        #[arg(long, default_value_t = ',')]
        separator: char,

        /// Ranked list files; standard input when omitted
        files: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    match cli.command {
        Command::Captures {
            database,
            output_location,
            redirect_target_location,
            follow_redirects,
            crawl_data_set,
        } => {
            let settings = CapturesSettings::new(
                database,
                &output_location,
                &redirect_target_location,
                follow_redirects,
                crawl_data_set,
            )?;
            run_captures(&settings)
        }

        Command::RankedList {
            table_location,
            output_location,
            crawl_data_set,
        } => {
            let settings = ListSettings::new(&table_location, &output_location, crawl_data_set)?;
            for crawl in &settings.crawls {
                write_ranked_list(&settings.table_location, &settings.output_location, crawl)?;
            }
            Ok(())
        }

        Command::DownloadList {
            table_location,
            output_location,
            crawl_data_set,
        } => {
            let settings = ListSettings::new(&table_location, &output_location, crawl_data_set)?;
            for crawl in &settings.crawls {
                write_download_list(&settings.table_location, &settings.output_location, crawl)?;
            }
            Ok(())
        }

        Command::CombineRanks { separator, files } => run_combine_ranks(separator, &files),
    }
}

/// Runs the capture extraction for every requested crawl, one after the
/// other. A failure aborts the run; artifacts of previously completed
/// crawls stay in place.
fn run_captures(settings: &CapturesSettings) -> anyhow::Result<()> {
    let mut store = SqliteStore::open(&settings.database, settings.layout.clone())
        .with_context(|| {
            format!(
                "failed to open capture index {}",
                settings.database.display()
            )
        })?;

    for crawl in &settings.crawls {
        tracing::info!("Processing crawl {}", crawl);
        let summary = follow_crawl(
            &mut store,
            &settings.layout,
            crawl,
            settings.follow_redirects,
        )?;
        tracing::info!(
            "Crawl {} done: {} round(s) materialized, {} capture row(s)",
            summary.crawl,
            summary.rounds(),
            summary.rows_per_round.iter().sum::<u64>()
        );
    }

    Ok(())
}

/// Combines ranked lists from the given files (concatenated) or from
/// standard input.
fn run_combine_ranks(separator: char, files: &[PathBuf]) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if files.is_empty() {
        let stdin = io::stdin();
        combine_sorted_with_rank(stdin.lock(), &mut out, separator)?;
    } else {
        let mut readers: Box<dyn Read> = Box::new(io::empty());
        for path in files {
            let file =
                File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
            readers = Box::new(readers.chain(file));
        }
        combine_sorted_with_rank(BufReader::new(readers), &mut out, separator)?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("robotstxt_captures=info,warn"),
            1 => EnvFilter::new("robotstxt_captures=debug,info"),
            2 => EnvFilter::new("robotstxt_captures=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
