//! DUPR rating history scraper
//!
//! Recovers doubles match records from pickleball.com rating history pages
//! and scrapes players in resilient batches.

mod batch;
mod cli;
mod config;
mod retry;
mod scraper;
mod storage;
mod types;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dupr_scraper=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scrape {
            player_url,
            start_page,
            max_pages,
            output,
            no_headless,
        } => cli::run_scrape(player_url, start_page, max_pages, output, no_headless).await,
        Commands::Batch {
            urls,
            urls_file,
            timeout,
            output_dir,
        } => cli::run_batch(urls, urls_file, timeout, output_dir).await,
        Commands::Parse {
            html_file,
            player,
            format,
        } => cli::run_parse(html_file, player, format),
    }
}
