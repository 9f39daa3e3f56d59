//! Offre-Scraper main entry point
//!
//! This is the command-line interface for the resumable job-listing scraper.

use anyhow::Context;
use clap::Parser;
use offre_scraper::browser::ChromiumBrowser;
use offre_scraper::checkpoint::CheckpointStore;
use offre_scraper::config::{load_config_with_hash, validate, Config};
use offre_scraper::crawler::{resume_choice, Coordinator, ResumeChoice};
use offre_scraper::logging::setup_logging;
use offre_scraper::url::search_url;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Offre-Scraper: a resumable job-listing scraper
///
/// Offre-Scraper walks the paginated search results of a job board in a real
/// browser, extracts one record per posting into a CSV file and checkpoints
/// every step so an interrupted run picks up where it stopped.
#[derive(Parser, Debug)]
#[command(name = "offre-scraper")]
#[command(version = "1.0.0")]
#[command(about = "A resumable job-listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume a previous run without asking
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Discard previous progress without asking
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Run the browser without a visible window
    #[arg(long)]
    headless: bool,

    /// Override the last results page to process
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the number of detail pages fetched concurrently
    #[arg(long, value_name = "N")]
    parallel_tabs: Option<usize>,

    /// Validate config and show what would be scraped without launching a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config, config_hash) = match prepare_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::from(1);
        }
    };

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, Some(Path::new(&config.output.log_path)))
    {
        eprintln!("Error: cannot open log file {}: {}", config.output.log_path, e);
        return ExitCode::from(1);
    }
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    match handle_scrape(&cli, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Fatal error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Loads the configuration, applies the command-line overrides and re-validates
fn prepare_config(cli: &Cli) -> anyhow::Result<(Config, String)> {
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;

    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(parallel_tabs) = cli.parallel_tabs {
        config.crawler.parallel_tabs = parallel_tabs;
    }

    validate(&config).context("Invalid command-line override")?;
    Ok((config, hash))
}

/// Handles the --dry-run mode: validates config and shows what would be scraped
fn handle_dry_run(config: &Config) -> ExitCode {
    println!("=== Offre-Scraper Dry Run ===\n");

    println!("Search:");
    match search_url(&config.site) {
        Ok(url) => println!("  URL: {}", url),
        Err(e) => println!("  URL: invalid ({})", e),
    }
    println!("  Query: {}", config.site.query);
    println!("  Location: {}", config.site.location);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Parallel tabs: {}", config.crawler.parallel_tabs);
    println!(
        "  Browser: {}",
        if config.browser.headless { "headless" } else { "visible" }
    );

    println!("\nDelays (ms):");
    for (name, interval) in config.delays.named() {
        println!("  {}: {}-{}", name, interval.min, interval.max);
    }

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  Checkpoint: {}", config.output.checkpoint_path);
    println!("  Log: {}", config.output.log_path);

    let previous = CheckpointStore::load(&config.output.checkpoint_path);
    let checkpoint = previous.checkpoint();
    if checkpoint.has_progress() {
        println!(
            "\nPrevious run: {} offers, last page {}",
            checkpoint.job_offers.len(),
            checkpoint.last_page
        );
    }

    println!("\n✓ Configuration is valid");
    ExitCode::SUCCESS
}

/// Handles the main scrape operation
async fn handle_scrape(cli: &Cli, config: Config) -> anyhow::Result<ExitCode> {
    let choice = decide_resume(cli, &config).await?;

    tracing::info!(
        "Searching \"{}\" in \"{}\" | {} tabs | max {} pages",
        config.site.query,
        config.site.location,
        config.crawler.parallel_tabs,
        config.crawler.max_pages
    );

    let browser = ChromiumBrowser::launch(&config.browser)
        .await
        .context("Failed to launch browser")?;

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let mut coordinator = Coordinator::new(&config, Arc::new(browser), cancel)?;
    coordinator.apply_resume_choice(choice)?;

    let report = coordinator.run().await;
    Ok(ExitCode::from(report.exit_code()))
}

/// Asks whether to resume when a previous run left progress behind
async fn decide_resume(cli: &Cli, config: &Config) -> anyhow::Result<ResumeChoice> {
    if cli.fresh {
        return Ok(ResumeChoice::Reset);
    }

    let previous = CheckpointStore::load(&config.output.checkpoint_path);
    let checkpoint = previous.checkpoint();
    if cli.resume || !checkpoint.has_progress() {
        return Ok(ResumeChoice::Resume);
    }

    println!(
        "\nPrevious progress: {} offers | page {}",
        checkpoint.job_offers.len(),
        checkpoint.last_page
    );
    println!("Press ENTER to continue or type \"reset\" to start over");

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await
        .context("Failed to read answer")?;

    Ok(resume_choice(&answer))
}

/// First Ctrl-C stops the crawl gracefully, a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Stopping after the current step (Ctrl-C again to force)");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nForced stop");
            std::process::exit(1);
        }
    });
}
