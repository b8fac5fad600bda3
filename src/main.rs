//! rustopenalex - OpenAlex citation metrics toolkit
//!
//! Batch jobs over the OpenAlex works endpoint: fetch, rank, filter,
//! classify and export to CSV.
//!
//! ## Usage
//!
//! ```bash
//! rustopenalex journal-citations --journal S2764690092
//! rustopenalex time-window --journal S4306500963 --from 1994
//! rustopenalex preference --journal S4210216073
//! ```

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};
use rustopenalex::classify::{self, YearlyTally};
use rustopenalex::client::{ClientConfig, OpenAlexClient, OPENALEX_API_BASE};
use rustopenalex::export;
use rustopenalex::fetcher::{self, Query};
use rustopenalex::stats::{self, AuthorTotal};
use rustopenalex::work::{self, Record};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Terms for environmental and resource economics
const ERE_KEYWORDS: &[&str] = &[
    "Environment",
    "Environmental",
    "Pollution",
    "Energy",
    "Climate",
    "Carbon",
    "Resource",
    "Resources",
];

const STATED_PREFERENCE_KEYWORDS: &[&str] = &[
    "stated preference",
    "stated preference methods",
    "discrete choice models",
    "conjoint analysis",
    "contingent valuation",
    "willingness to pay",
];

const REVEALED_PREFERENCE_KEYWORDS: &[&str] = &[
    "revealed preference",
    "revealed preference methods",
    "hedonic pricing",
    "hedonic index",
    "property values",
    "house prices",
];

// ============================================================================
// CLI Definition
// ============================================================================

/// OpenAlex citation metrics toolkit
#[derive(Parser)]
#[command(name = "rustopenalex")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Output directory
    #[arg(short, long, global = true, default_value = "./output")]
    output: PathBuf,

    /// Email for the OpenAlex polite pool
    #[arg(long, global = true)]
    mailto: Option<String>,

    /// OpenAlex API root
    #[arg(long, global = true, default_value = OPENALEX_API_BASE)]
    base_url: String,

    /// Minimum pause between API requests, in milliseconds
    #[arg(long, global = true, default_value_t = 1000)]
    page_delay_ms: u64,

    /// Retries per request for transient failures
    #[arg(long, global = true, default_value_t = 5)]
    max_retries: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank every work of a journal by citations and report top-N totals and means
    JournalCitations {
        /// OpenAlex source id (e.g. S2764690092)
        #[arg(long)]
        journal: String,

        /// Top-N sizes to summarise
        #[arg(long, value_delimiter = ',', default_values_t = [500, 1000])]
        tops: Vec<usize>,
    },

    /// Per-year citation statistics for a journal's most cited works
    TimeWindow {
        /// OpenAlex source id
        #[arg(long)]
        journal: String,

        /// Number of most cited works to consider
        #[arg(long, default_value_t = 1000)]
        cap: usize,

        /// First year of the window
        #[arg(long, default_value_t = 1994)]
        from: i64,

        /// Last year of the window (default: current year)
        #[arg(long)]
        to: Option<i64>,

        /// Top-N sizes reported per year
        #[arg(long, value_delimiter = ',', default_values_t = [100, 500])]
        tiers: Vec<usize>,
    },

    /// Keep a journal's most cited works that mention any keyword
    KeywordFilter {
        /// OpenAlex source id
        #[arg(long)]
        journal: String,

        /// Number of most cited works to consider
        #[arg(long, default_value_t = 800)]
        cap: usize,

        /// Comma-separated keywords (default: environmental economics terms)
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,
    },

    /// List the authors of each work in a works CSV
    WorkAuthors {
        /// CSV with an `id` column of OpenAlex work ids
        #[arg(long)]
        works: PathBuf,
    },

    /// Rank authors by citations of their keyword-matching works
    AuthorRanking {
        /// CSV with `author_name` and `author_url` columns
        #[arg(long)]
        authors: PathBuf,

        /// Comma-separated keywords (default: environmental economics terms)
        #[arg(long, value_delimiter = ',')]
        keywords: Vec<String>,

        /// Number of authors to keep
        #[arg(long, default_value_t = 30)]
        top: usize,
    },

    /// Classify a journal's works by two competing keyword sets
    Preference {
        /// OpenAlex source id
        #[arg(long)]
        journal: String,

        /// First keyword set (default: stated preference terms)
        #[arg(long, value_delimiter = ',')]
        first: Vec<String>,

        /// Second keyword set (default: revealed preference terms)
        #[arg(long, value_delimiter = ',')]
        second: Vec<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = ClientConfig::builder()
        .base_url(cli.base_url)
        .max_retries(cli.max_retries)
        .page_delay(Duration::from_millis(cli.page_delay_ms));
    if let Some(mailto) = cli.mailto {
        config = config.mailto(mailto);
    }
    let client = OpenAlexClient::new(config.build()).context("Failed to create OpenAlex client")?;

    let output = cli.output;
    match cli.command {
        Commands::JournalCitations { journal, tops } => {
            run_journal_citations(&client, &output, &journal, &tops).await
        }
        Commands::TimeWindow {
            journal,
            cap,
            from,
            to,
            tiers,
        } => run_time_window(&client, &output, &journal, cap, from, to, &tiers).await,
        Commands::KeywordFilter {
            journal,
            cap,
            keywords,
        } => {
            let keywords = or_default(keywords, ERE_KEYWORDS);
            run_keyword_filter(&client, &output, &journal, cap, &keywords).await
        }
        Commands::WorkAuthors { works } => run_work_authors(&client, &output, &works).await,
        Commands::AuthorRanking {
            authors,
            keywords,
            top,
        } => {
            run_author_ranking(&client, &output, &authors, &or_default(keywords, ERE_KEYWORDS), top)
                .await
        }
        Commands::Preference {
            journal,
            first,
            second,
        } => {
            run_preference(
                &client,
                &output,
                &journal,
                &or_default(first, STATED_PREFERENCE_KEYWORDS),
                &or_default(second, REVEALED_PREFERENCE_KEYWORDS),
            )
            .await
        }
    }
}

fn or_default(given: Vec<String>, fallback: &[&str]) -> Vec<String> {
    if given.is_empty() {
        fallback.iter().map(|s| s.to_string()).collect()
    } else {
        given
    }
}

/// Run a fetch and report, but do not fail on, an incomplete walk.
async fn fetch_reported(client: &OpenAlexClient, query: &Query, label: &str) -> Vec<Record> {
    let outcome = fetcher::fetch(client, query).await;
    if let Some(e) = &outcome.failure {
        warn!(
            label = label,
            pages = outcome.pages,
            fetched = outcome.records.len(),
            error = %e,
            "Incomplete fetch, continuing with partial results"
        );
        println!(
            "Warning: {} incomplete after {} pages ({} records): {}",
            label,
            outcome.pages,
            outcome.records.len(),
            e
        );
    }
    outcome.records
}

// ============================================================================
// Journal Citations
// ============================================================================

async fn run_journal_citations(
    client: &OpenAlexClient,
    output: &std::path::Path,
    journal: &str,
    tops: &[usize],
) -> Result<()> {
    let journal = work::short_id(journal);
    let query = Query::source_works(&journal)?;

    println!("\n--- Fetching all works of {} ---", journal);
    let works = fetch_reported(client, &query, &journal).await;
    println!("Total results: {}", works.len());

    let ranked = stats::rank_by_citations(works);
    for (i, record) in ranked.iter().take(10).enumerate() {
        println!(
            "{}: {} ({} citations)",
            i + 1,
            work::title(record),
            work::cited_by_count(record)
        );
    }

    let folder = export::output_folder(output, &format!("citations_{}", journal))?;
    export::write_records(&folder.join("works_by_citations.csv"), &ranked)?;

    let summaries: Vec<_> = tops
        .iter()
        .map(|&n| stats::top_n_summary(&ranked, n))
        .collect();
    for summary in &summaries {
        println!(
            "Top {} cited_by_count total: {}, average: {:.2} (over {} works)",
            summary.requested, summary.total, summary.average, summary.actual_count
        );
    }
    export::save_csv(&folder.join("citation_summary.csv"), &summaries)?;

    println!("\n✓ Done. Results in: {}", folder.display());
    Ok(())
}

// ============================================================================
// Time Window
// ============================================================================

async fn run_time_window(
    client: &OpenAlexClient,
    output: &std::path::Path,
    journal: &str,
    cap: usize,
    from: i64,
    to: Option<i64>,
    tiers: &[usize],
) -> Result<()> {
    let to = to.unwrap_or_else(|| i64::from(Local::now().year()));
    if from > to {
        anyhow::bail!("--from ({}) is after --to ({})", from, to);
    }

    let journal = work::short_id(journal);
    let query = Query::primary_source_works(&journal)?
        .sort("cited_by_count:desc")
        .item_cap(cap)?;

    println!("\n--- Fetching top {} cited works of {} ---", cap, journal);
    let works = fetch_reported(client, &query, &journal).await;
    println!("Total works: {}", works.len());

    println!("\n--- Fetching citing works ---");
    let mut cited_by: HashMap<String, Vec<Record>> = HashMap::new();
    for (idx, record) in works.iter().enumerate() {
        let (Some(id), Some(list_url)) = (work::id(record), work::cited_by_api_url(record)) else {
            continue;
        };

        let citing_query = match Query::from_list_url(list_url) {
            Ok(q) => q.select("id,publication_year"),
            Err(e) => {
                warn!(work = id, error = %e, "Skipping unusable cited_by_api_url");
                continue;
            }
        };

        let citing = fetch_reported(client, &citing_query, id).await;
        info!(
            work = id,
            citations = citing.len(),
            progress = idx + 1,
            total = works.len(),
            "Fetched citing works"
        );
        cited_by.insert(id.to_string(), citing);
    }

    let years: Vec<i64> = (from..=to).rev().collect();
    let series = stats::window_series(&works, &cited_by, &years, tiers);

    let folder = export::output_folder(output, &format!("time_window_{}", journal))?;
    let headers = series
        .first()
        .map(|s| s.to_row().0)
        .unwrap_or_default();
    let rows = series.iter().map(|s| s.to_row().1);
    export::write_rows(&folder.join("time_window.csv"), &headers, rows)?;

    println!("\n✓ Done. {} years written to: {}", series.len(), folder.display());
    Ok(())
}

// ============================================================================
// Keyword Filter
// ============================================================================

async fn run_keyword_filter(
    client: &OpenAlexClient,
    output: &std::path::Path,
    journal: &str,
    cap: usize,
    keywords: &[String],
) -> Result<()> {
    let journal = work::short_id(journal);
    let query = Query::primary_source_works(&journal)?
        .sort("cited_by_count:desc")
        .item_cap(cap)?;

    println!("\n--- Fetching top {} cited works of {} ---", cap, journal);
    let works = fetch_reported(client, &query, &journal).await;
    println!("Total works fetched: {}", works.len());

    let filtered = classify::filter_by_keywords(works, keywords);
    println!("Total filtered works: {}", filtered.len());

    let folder = export::output_folder(output, &format!("filtered_{}", journal))?;
    export::write_records(&folder.join("filtered_works.csv"), &filtered)?;

    println!("\n✓ Done. Results in: {}", folder.display());
    Ok(())
}

// ============================================================================
// Authors
// ============================================================================

#[derive(Debug, Serialize)]
struct WorkAuthorRow {
    work_id: String,
    author_name: String,
    author_url: String,
}

async fn run_work_authors(
    client: &OpenAlexClient,
    output: &std::path::Path,
    works_csv: &std::path::Path,
) -> Result<()> {
    let ids = export::read_work_ids(works_csv)
        .with_context(|| format!("Failed to read work ids from {}", works_csv.display()))?;
    println!("Looking up authors of {} works...", ids.len());

    let mut rows = Vec::new();
    for id in &ids {
        match client.get_work(id).await {
            Ok(record) => {
                rows.extend(work::authors(&record).into_iter().map(|a| WorkAuthorRow {
                    work_id: id.clone(),
                    author_name: a.author_name,
                    author_url: a.author_url,
                }));
            }
            Err(e) => {
                warn!(work = %id, error = %e, "Failed to fetch work");
                println!("Failed to fetch data for {}: {}", id, e);
            }
        }
    }

    let folder = export::output_folder(output, "work_authors")?;
    export::save_csv(&folder.join("work_authors.csv"), &rows)?;

    println!("\n✓ Done. {} author rows in: {}", rows.len(), folder.display());
    Ok(())
}

#[derive(Debug, Serialize)]
struct AuthorSummaryRow {
    rank: usize,
    author_name: String,
    author_url: String,
    total_citations: i64,
    matching_works: usize,
}

async fn run_author_ranking(
    client: &OpenAlexClient,
    output: &std::path::Path,
    authors_csv: &std::path::Path,
    keywords: &[String],
    top: usize,
) -> Result<()> {
    let authors = export::read_authors(authors_csv)
        .with_context(|| format!("Failed to read authors from {}", authors_csv.display()))?;

    let mut seen = HashSet::new();
    let mut totals = Vec::new();

    for author in authors {
        let author_id = work::short_id(&author.author_url);
        if author_id.is_empty() || author_id == "N/A" {
            warn!(author = %author.author_name, "Author has no OpenAlex id, skipping");
            continue;
        }
        if !seen.insert(author_id.clone()) {
            continue;
        }

        println!("Processing author: {}", author.author_name);
        let query = Query::author_works(&author_id)?;
        let works = fetch_reported(client, &query, &author.author_name).await;
        let matching = classify::filter_by_keywords(works, keywords);

        totals.push(AuthorTotal::new(author, matching));
    }

    let ranked = stats::rank_authors(totals, top);
    let folder = export::output_folder(output, &format!("top_{}_authors", top))?;

    let mut summary = Vec::with_capacity(ranked.len());
    for (idx, author) in ranked.iter().enumerate() {
        let rank = idx + 1;
        if !author.works.is_empty() {
            let file = format!("{:02}_{}.csv", rank, export::sanitize_file_name(&author.author_name));
            export::write_records(&folder.join(file), &author.works)?;
        }
        summary.push(AuthorSummaryRow {
            rank,
            author_name: author.author_name.clone(),
            author_url: author.author_url.clone(),
            total_citations: author.total_citations,
            matching_works: author.works.len(),
        });
    }
    export::save_csv(&folder.join("author_ranking.csv"), &summary)?;

    println!("\n✓ Done. Top {} authors saved to: {}", summary.len(), folder.display());
    Ok(())
}

// ============================================================================
// Preference Classification
// ============================================================================

#[derive(Debug, Serialize)]
struct KeywordCountRow {
    id: String,
    title: String,
    year: Option<i64>,
    first_count: usize,
    second_count: usize,
    class: classify::Classification,
}

#[derive(Debug, Serialize)]
struct YearRow {
    year: i64,
    first_higher: u64,
    second_higher: u64,
}

async fn run_preference(
    client: &OpenAlexClient,
    output: &std::path::Path,
    journal: &str,
    first: &[String],
    second: &[String],
) -> Result<()> {
    let journal = work::short_id(journal);
    let query = Query::primary_source_works(&journal)?;

    println!("\n--- Fetching all works of {} ---", journal);
    let works = fetch_reported(client, &query, &journal).await;

    let mut rows = Vec::with_capacity(works.len());
    let mut tally = YearlyTally::new();
    for record in &works {
        let counts = classify::classify(record, first, second);
        let year = work::publication_year(record);
        if let Some(year) = year {
            tally.record(year, counts.class);
        }
        rows.push(KeywordCountRow {
            id: work::id(record).unwrap_or_default().to_string(),
            title: work::title(record).to_string(),
            year,
            first_count: counts.first,
            second_count: counts.second,
            class: counts.class,
        });
    }

    let folder = export::output_folder(output, &format!("preference_{}", journal))?;
    export::save_csv(&folder.join("work_keyword_counts.csv"), &rows)?;

    let yearly: Vec<YearRow> = tally
        .iter()
        .map(|(year, counts)| YearRow {
            year,
            first_higher: counts.first_higher,
            second_higher: counts.second_higher,
        })
        .collect();
    export::save_csv(&folder.join("yearly_counts.csv"), &yearly)?;

    println!(
        "Classified {} works across {} years. Results in: {}",
        rows.len(),
        yearly.len(),
        folder.display()
    );
    Ok(())
}
