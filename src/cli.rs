//! CLI commands for dupr-scraper.
//!
//! Scrapes one player's rating history, supervises a batch of players, or
//! parses a saved page offline.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;

use crate::batch::{read_urls_file, BatchRunner, ProcessLauncher, Progress};
use crate::config::AppConfig;
use crate::scraper::parsers::PageParse;
use crate::scraper::{
    player_display_name, player_slug, rating_history_url, Browser, BrowserOptions, MatchParser,
    PageIterator, PageLimits, RateLimiter, StopReason,
};
use crate::storage::MatchRepository;
use crate::types::{JobStatus, StructuredMatch};

#[derive(Parser)]
#[command(name = "dupr-scraper")]
#[command(version, about = "Scrape DUPR rating history from pickleball.com", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scrape one player's rating history to CSV
    Scrape {
        /// URL to the player's rating history page, or the player slug
        #[arg(value_name = "PLAYER_URL")]
        player_url: String,

        /// Page to start scraping from
        #[arg(long, default_value_t = 1)]
        start_page: u32,

        /// Maximum number of pages to scrape
        #[arg(long)]
        max_pages: Option<u32>,

        /// Output CSV file
        #[arg(short, long, default_value = "dupr_data.csv")]
        output: PathBuf,

        /// Show the browser window
        #[arg(long)]
        no_headless: bool,
    },

    /// Scrape many players, each under a timeout
    Batch {
        /// Player rating history URLs
        #[arg(value_name = "URL")]
        urls: Vec<String>,

        /// File with one URL per line
        #[arg(short, long)]
        urls_file: Option<PathBuf>,

        /// Per-player timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Directory for per-player CSV files
        #[arg(long)]
        output_dir: Option<String>,
    },

    /// Parse a saved rating history page
    Parse {
        /// Path to the saved HTML
        #[arg(value_name = "HTML_FILE")]
        html_file: PathBuf,

        /// Player slug or URL the page belongs to
        #[arg(short, long)]
        player: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Scrape one player. Fails when a page could not be rendered or the run was
/// interrupted; rows saved before that stay in `output`.
pub async fn run_scrape(
    player_url: String,
    start_page: u32,
    max_pages: Option<u32>,
    output: PathBuf,
    no_headless: bool,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if no_headless {
        config.scraper.headless = false;
    }

    // A bare slug is accepted too
    let player_url = match player_slug(&player_url) {
        Some(_) => player_url,
        None => rating_history_url(player_url.trim_matches('/')),
    };
    let slug = player_slug(&player_url)
        .with_context(|| format!("Not a player URL: {}", player_url))?;
    let player_name = player_display_name(slug);
    eprintln!("Scraping matches for: {}", player_name);

    let mut repo = MatchRepository::new(&output);
    repo.reset()?;

    let browser = Browser::launch(BrowserOptions::from_config(&config.scraper)).await?;
    let limits = PageLimits {
        max_pages,
        max_empty_pages: config.scraper.max_empty_pages,
    };
    let outcome = {
        let iterator = PageIterator::new(
            &browser,
            RateLimiter::from_millis(config.scraper.page_delay_ms),
            limits,
            player_url.as_str(),
            player_name,
        );
        tokio::select! {
            outcome = iterator.run(start_page, &mut repo) => Some(outcome),
            _ = shutdown_signal() => None,
        }
    };
    browser.close().await?;

    let Some(outcome) = outcome else {
        bail!(
            "Interrupted, {} matches saved to {}",
            repo.match_count()?,
            output.display()
        );
    };
    let outcome = outcome?;

    let total = outcome.state.accumulated_matches.len();
    if total == 0 {
        println!("No matches found");
    } else {
        println!("Total matches scraped: {}", total);
        println!("Data saved to {}", output.display());
    }

    if let StopReason::RenderFailed(e) = outcome.stop {
        bail!("Stopped at page {}: {}", outcome.state.current_page, e);
    }
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Run the batch, one child process per player.
pub async fn run_batch(
    mut urls: Vec<String>,
    urls_file: Option<PathBuf>,
    timeout: Option<u64>,
    output_dir: Option<String>,
) -> anyhow::Result<()> {
    let mut config = AppConfig::load()?;
    if let Some(secs) = timeout {
        config.batch.timeout_secs = secs;
    }
    if let Some(dir) = output_dir {
        config.batch.output_dir = dir;
    }

    if let Some(path) = urls_file {
        urls.extend(read_urls_file(&path)?);
    }
    if urls.is_empty() {
        bail!("No player URLs given");
    }

    println!(
        "Scraping {} players with {}s timeout...\n",
        urls.len(),
        config.batch.timeout_secs
    );

    let runner = BatchRunner::new(ProcessLauncher::current_exe()?, &config.batch);
    let report = runner
        .run(&urls, |progress| match progress {
            Progress::Started { index, total, url } => {
                // Line is finished once the job ends
                if let Err(e) = write_job_prefix(&mut std::io::stdout(), index, total, url) {
                    warn!("Could not write progress: {}", e);
                }
            }
            Progress::Finished { job, .. } => println!("{}", job.message),
        })
        .await;

    let summary = report.summary;
    println!("\n=== Summary ===");
    println!("Success: {}", summary.success);
    println!("Partial: {}", summary.partial);
    println!("Failed: {}", summary.failed);
    println!("Total matches: {}", summary.total_matches);

    let incomplete: Vec<_> = report
        .jobs
        .iter()
        .filter(|job| job.status != JobStatus::Success)
        .collect();
    if !incomplete.is_empty() {
        println!("\n=== Not completed ===");
        for job in incomplete {
            println!("{} [{}]", job.url, job.status);
        }
    }

    Ok(())
}

/// Parse a saved page and print what was recovered.
pub fn run_parse(html_file: PathBuf, player: String, format: OutputFormat) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(&html_file)
        .with_context(|| format!("Failed to read {}", html_file.display()))?;
    let slug = player_slug(&player).unwrap_or(&player);
    let player_name = player_display_name(slug);

    let parsed = MatchParser::parse_page(&html, &player_name);

    match format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "player": player_name,
                "fragments": parsed.fragments,
                "rejected": parsed.rejections.len(),
                "matches": parsed.matches,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => print_table(&player_name, &parsed),
    }

    Ok(())
}

fn print_table(player_name: &str, parsed: &PageParse) {
    println!("Player: {}", player_name);
    println!(
        "Fragments: {}  Matches: {}  Dropped: {}",
        parsed.fragments,
        parsed.matches.len(),
        parsed.rejections.len()
    );
    println!();

    for (i, m) in parsed.matches.iter().enumerate() {
        println!("  {:3}. {}", i + 1, describe(m));
    }

    if !parsed.rejections.is_empty() {
        println!();
        println!("=== Dropped ===");
        for r in &parsed.rejections {
            println!("  {:?}", r);
        }
    }
}

/// `[i/n] slug... ` with no newline, flushed so it shows while the job runs.
fn write_job_prefix(out: &mut impl Write, index: usize, total: usize, url: &str) -> io::Result<()> {
    let name = player_slug(url).unwrap_or(url);
    write!(out, "[{}/{}] {}... ", index, total, name)?;
    out.flush()
}

fn describe(m: &StructuredMatch) -> String {
    let name = |n: &Option<String>| n.clone().unwrap_or_else(|| "?".to_string());
    let date = m
        .date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let scores: Vec<String> = m
        .games
        .iter()
        .flatten()
        .map(|g| format!("{}-{}", g.team, g.opponent))
        .collect();

    format!(
        "{} {} / {} vs {} / {}  {}  ({:+.3})",
        date,
        name(&m.team1_player1_name),
        name(&m.team1_player2_name),
        name(&m.team2_player1_name),
        name(&m.team2_player2_name),
        scores.join(", "),
        m.team1_player1.change
    )
}
